mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::warn;
use walkdir::WalkDir;

pub use types::{AnalysisReport, BigramCount, FetchSummary, Readability, Similarity, WordCount};

/// Pretty-print a JSON document and keep at most `lines` lines of it.
pub fn preview(json: &str, lines: usize) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(json).context("report is not valid JSON")?;
    let pretty = serde_json::to_string_pretty(&value)?;
    Ok(pretty.lines().take(lines).map(str::to_string).collect())
}

/// Read and parse a JSON artifact. Absence is not an error; a malformed file
/// is logged and treated as absent.
pub fn load_optional<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not parse artifact");
            None
        }
    }
}

/// Regular files under `dir`, sorted.
pub fn list_artifacts(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
