use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Terminal failures of either runner. Every variant ends the process with a
/// message on stderr and a nonzero exit code.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Usage(String),

    #[error("input file {} not found", .0.display())]
    MissingInput(PathBuf),

    #[error("container engine unavailable: {0:#}")]
    EngineUnavailable(anyhow::Error),

    #[error("`{step}` failed: {reason}")]
    Compose { step: String, reason: String },

    #[error("service `{service}` was not running after {}s", .waited.as_secs())]
    NotReady { service: String, waited: Duration },

    #[error("pipeline timeout after {} seconds", .waited.as_secs())]
    Timeout { waited: Duration },

    #[error("pipeline failed - no output generated ({} missing)", .0.display())]
    MissingOutput(PathBuf),

    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RunError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T, E = RunError> = std::result::Result<T, E>;
