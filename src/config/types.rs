use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Which compose front-end to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeFlavor {
    /// Use `docker compose` when it answers, else a v2 `docker-compose`.
    Auto,
    /// `docker compose`
    Plugin,
    /// `docker-compose`
    Standalone,
}

impl ComposeFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposeFlavor::Auto => "auto",
            ComposeFlavor::Plugin => "plugin",
            ComposeFlavor::Standalone => "standalone",
        }
    }
}

/// Settings for the single-container fetch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub image: String,
    pub container_name: String,
    pub input_mount: String,
    pub output_mount: String,
    pub run_as_user: bool,
    /// Extra `docker run` arguments, shell-quoted.
    pub extra_args: String,
    pub timeout_secs: u64,
}

impl FetchConfig {
    /// Split `extra_args` the way a POSIX shell would.
    pub fn extra_args(&self) -> Result<Vec<String>> {
        shell_words::split(&self.extra_args)
            .with_context(|| format!("invalid fetch.extra_args: {:?}", self.extra_args))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            image: "fetcher:latest".to_string(),
            container_name: "http-fetcher".to_string(),
            input_mount: "/data/input/urls.txt".to_string(),
            output_mount: "/data/output".to_string(),
            run_as_user: true,
            extra_args: String::new(),
            timeout_secs: 3600,
        }
    }
}

/// Settings for the compose-driven fetch/process/analyze pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub compose_file: PathBuf,
    pub project: Option<String>,
    pub compose: ComposeFlavor,
    pub fetcher_service: String,
    pub analyzer_service: String,
    /// Where the URL list is copied inside the fetcher.
    pub url_list_target: String,
    /// File whose presence inside the analyzer marks completion.
    pub marker_path: String,
    pub status_dir: String,
    pub output_dir: PathBuf,
    pub report_name: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub ready_interval_ms: u64,
    pub ready_timeout_secs: u64,
    /// Ceiling for a single compose invocation (`up --build` can be slow).
    pub command_timeout_secs: u64,
    pub preview_lines: usize,
}

impl PipelineConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            deadline: Duration::from_secs(self.timeout_secs),
            ready_interval: Duration::from_millis(self.ready_interval_ms),
            ready_deadline: Duration::from_secs(self.ready_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_name)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from("docker-compose.yaml"),
            project: None,
            compose: ComposeFlavor::Auto,
            fetcher_service: "fetcher".to_string(),
            analyzer_service: "analyzer".to_string(),
            url_list_target: "/shared/input/urls.txt".to_string(),
            marker_path: "/shared/analysis/final_report.json".to_string(),
            status_dir: "/shared/status".to_string(),
            output_dir: PathBuf::from("output"),
            report_name: "final_report.json".to_string(),
            poll_interval_secs: 5,
            timeout_secs: 300,
            ready_interval_ms: 500,
            ready_timeout_secs: 60,
            command_timeout_secs: 1800,
            preview_lines: 20,
        }
    }
}

/// Resolved wait intervals and deadlines for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub deadline: Duration,
    pub ready_interval: Duration,
    pub ready_deadline: Duration,
    pub command_timeout: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
}
