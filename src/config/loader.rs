use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::types::Config;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".fetchpipe.yaml";

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `.fetchpipe.yaml` in `dir` is
/// used if present and built-in defaults otherwise.
pub fn load(dir: &Path, path: Option<&Path>) -> Result<Config> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (dir.join(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            bail!("config file not found: {}", path.display());
        }
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = parse(&contents).with_context(|| format!("invalid config {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn parse(contents: &str) -> Result<Config> {
    // An empty file deserializes to unit, not to a mapping.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Resolve a possibly-relative path against `base`.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
