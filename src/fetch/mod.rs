//! Single-fetch runner: one container, the URL list mounted read-only and the
//! output directory mounted read-write.

pub mod commands;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::docker::{self, Runner};
use crate::error::{Result, RunError};
use crate::report::{self, FetchSummary};

pub use commands::fetch_command;

/// Host paths for one fetch job.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

impl FetchRequest {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
        }
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    /// The container's exit code; 1 if it was killed or had none.
    pub exit_code: i32,
    pub timed_out: bool,
    pub output_dir: PathBuf,
    pub summary: Option<FetchSummary>,
}

impl FetchOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run one fetch job to completion, handing container output to `on_line`.
///
/// The input is checked and the output directory created before anything
/// touches the container engine.
pub fn run_fetch(
    cfg: &FetchConfig,
    request: &FetchRequest,
    runner: &dyn Runner,
    on_line: impl FnMut(&str),
) -> Result<FetchOutcome> {
    if !request.input.is_file() {
        return Err(RunError::MissingInput(request.input.clone()));
    }

    std::fs::create_dir_all(&request.output_dir).map_err(|e| {
        RunError::io(
            format!("creating output directory {}", request.output_dir.display()),
            e,
        )
    })?;

    let input = absolute(&request.input)?;
    let output_dir = absolute(&request.output_dir)?;
    let extra = cfg.extra_args().map_err(RunError::Config)?;

    info!(
        input = %input.display(),
        urls = count_urls(&input),
        output = %output_dir.display(),
        image = %cfg.image,
        "starting fetch container"
    );

    docker::ensure_available(runner).map_err(RunError::EngineUnavailable)?;

    let cmd = fetch_command(cfg, &input, &output_dir, extra);
    let result = docker::run_to_end(runner, cmd, on_line).map_err(RunError::EngineUnavailable)?;

    if result.timed_out {
        warn!(timeout_secs = cfg.timeout_secs, "fetch container timed out");
    }
    let exit_code = match result.exit_code {
        Some(code) if !result.timed_out => code,
        _ => 1,
    };

    let summary: Option<FetchSummary> = report::load_optional(&output_dir.join("summary.json"));
    if let Some(s) = &summary {
        info!("{}", s.headline());
    }

    Ok(FetchOutcome {
        exit_code,
        timed_out: result.timed_out,
        output_dir,
        summary,
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path)
        .map_err(|e| RunError::io(format!("resolving {}", path.display()), e))
}

/// Non-blank lines in the URL list; 0 if unreadable.
fn count_urls(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}
