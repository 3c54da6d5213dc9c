use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{PipelineConfig, Timing};
use crate::error::RunError;
use crate::report::AnalysisReport;

/// Input to the compose pipeline.
pub struct PipelineInput {
    pub urls: Vec<String>,
    pub config: PipelineConfig,
    pub timing: Timing,
    /// Base for relative `compose_file` and `output_dir`.
    pub work_dir: PathBuf,
}

impl PipelineInput {
    pub fn new(urls: Vec<String>, config: PipelineConfig, work_dir: impl Into<PathBuf>) -> Self {
        let timing = config.timing();
        Self {
            urls,
            config,
            timing,
            work_dir: work_dir.into(),
        }
    }
}

/// Identifies which pipeline phase is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reset,
    Start,
    AwaitReady,
    Inject,
    AwaitMarker,
    Collect,
    Shutdown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reset => "reset",
            Phase::Start => "start",
            Phase::AwaitReady => "await-ready",
            Phase::Inject => "inject",
            Phase::AwaitMarker => "await-marker",
            Phase::Collect => "collect",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful run leaves behind.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report_path: PathBuf,
    /// First lines of the pretty-printed report.
    pub preview: Vec<String>,
    pub report: Option<AnalysisReport>,
    /// Files copied out of the analyzer's status directory.
    pub status_files: Vec<PathBuf>,
    /// Time from the first marker probe until the marker was seen.
    pub waited: Duration,
}

/// Events emitted by the pipeline orchestrator.
#[derive(Debug)]
pub enum PipelineEvent {
    PhaseStarted(Phase),
    Log { phase: Phase, line: String },
    /// A readiness or marker probe came back negative.
    Waiting { phase: Phase, elapsed: Duration },
    PhaseFinished { phase: Phase, success: bool },
    Completed(PipelineOutcome),
    Aborted(RunError),
}
