use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{FetchConfig, PipelineConfig};

/// Drive containerized URL fetch jobs.
#[derive(Debug, Parser)]
#[command(name = "fetchpipe", version, about)]
pub struct Cli {
    /// Config file [default: ./.fetchpipe.yaml if present]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output; repeat for more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one fetch container over a URL list file.
    Fetch(FetchArgs),
    /// Run the compose fetch/process/analyze pipeline over URLs.
    Pipeline(PipelineArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Newline-delimited URL list, mounted read-only.
    pub input_file: PathBuf,
    /// Receives the container's output; created if missing.
    pub output_directory: PathBuf,

    /// Image to run instead of the configured one.
    #[arg(long)]
    pub image: Option<String>,
}

impl FetchArgs {
    pub fn apply(&self, cfg: &mut FetchConfig) {
        if let Some(image) = &self.image {
            cfg.image = image.clone();
        }
    }
}

#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// URLs to fetch, in order.
    #[arg(required = true, num_args = 1.., value_name = "URL")]
    pub urls: Vec<String>,

    /// Where the report and status files are copied.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Seconds to wait for the completion marker.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between marker checks.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    /// Compose definition to run.
    #[arg(long, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,
}

impl PipelineArgs {
    pub fn apply(&self, cfg: &mut PipelineConfig) {
        if let Some(output) = &self.output {
            cfg.output_dir = output.clone();
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_secs = timeout;
        }
        if let Some(interval) = self.poll_interval {
            cfg.poll_interval_secs = interval;
        }
        if let Some(file) = &self.compose_file {
            cfg.compose_file = file.clone();
        }
    }
}

/// Parse arguments without exiting the process.
pub fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)
}
