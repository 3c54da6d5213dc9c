use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::{debug, error, info, warn};

use fetchpipe::cli::{self, Cli, Command, FetchArgs, PipelineArgs};
use fetchpipe::config::{self, Config};
use fetchpipe::docker::ProcessRunner;
use fetchpipe::fetch::{self, FetchRequest};
use fetchpipe::logging;
use fetchpipe::pipeline::{self, Phase, PipelineEvent, PipelineInput};
use fetchpipe::{Result, RunError};

fn main() -> ExitCode {
    let cli = match cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    logging::init(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().map_err(|e| RunError::io("reading working directory", e))?;
    let mut cfg: Config = config::load(&cwd, cli.config.as_deref()).map_err(RunError::Config)?;

    match cli.command {
        Command::Fetch(args) => run_fetch(&mut cfg, &args),
        Command::Pipeline(args) => run_pipeline(cfg, args, cwd),
    }
}

fn run_fetch(cfg: &mut Config, args: &FetchArgs) -> Result<i32> {
    args.apply(&mut cfg.fetch);
    let request = FetchRequest::new(&args.input_file, &args.output_directory);

    let outcome = fetch::run_fetch(&cfg.fetch, &request, &ProcessRunner, |line| {
        println!("{line}")
    })?;

    if outcome.success() {
        info!(output = %outcome.output_dir.display(), "fetch complete");
    } else {
        warn!(
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            "fetch container failed"
        );
    }
    Ok(outcome.exit_code)
}

fn run_pipeline(cfg: Config, args: PipelineArgs, cwd: std::path::PathBuf) -> Result<i32> {
    let mut pipeline_cfg = cfg.pipeline;
    args.apply(&mut pipeline_cfg);
    let input = PipelineInput::new(args.urls, pipeline_cfg, cwd);

    let rx = pipeline::run_pipeline(input, Arc::new(ProcessRunner));
    for event in rx {
        match event {
            PipelineEvent::PhaseStarted(phase) => info!("{}", phase_banner(phase)),
            PipelineEvent::Log { phase, line } => debug!(%phase, "{line}"),
            PipelineEvent::Waiting {
                phase: Phase::AwaitMarker,
                elapsed,
            } => info!("waiting for results... ({}s elapsed)", elapsed.as_secs()),
            PipelineEvent::Waiting { phase, elapsed } => {
                debug!(%phase, elapsed_ms = elapsed.as_millis() as u64, "not ready yet")
            }
            PipelineEvent::PhaseFinished { phase, success } => {
                if success {
                    debug!(%phase, "done");
                } else {
                    warn!(%phase, "phase did not succeed");
                }
            }
            PipelineEvent::Completed(outcome) => {
                info!(
                    waited_secs = outcome.waited.as_secs(),
                    status_files = outcome.status_files.len(),
                    "pipeline complete"
                );
                println!("Results saved to {}", outcome.report_path.display());
                for line in &outcome.preview {
                    println!("{line}");
                }
                return Ok(0);
            }
            PipelineEvent::Aborted(e) => return Err(e),
        }
    }

    Err(RunError::Compose {
        step: "pipeline".into(),
        reason: "orchestrator stopped without a result".into(),
    })
}

fn phase_banner(phase: Phase) -> &'static str {
    match phase {
        Phase::Reset => "removing previous deployment",
        Phase::Start => "building and starting services",
        Phase::AwaitReady => "waiting for the fetcher to come up",
        Phase::Inject => "injecting URL list",
        Phase::AwaitMarker => "pipeline running",
        Phase::Collect => "copying results",
        Phase::Shutdown => "stopping services",
    }
}
