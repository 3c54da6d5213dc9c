use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config;
use crate::docker::{self, Compose, ContainerCommand, ContainerResult, Runner};
use crate::error::{Result, RunError};
use crate::report::{self, AnalysisReport};

use super::types::{Phase, PipelineEvent, PipelineInput, PipelineOutcome};
use super::url_list::write_url_list;

/// Launch the compose pipeline on a background thread.
///
/// Returns a receiver that streams `PipelineEvent` values. The final event
/// is always either `Completed` or `Aborted`.
pub fn run_pipeline(input: PipelineInput, runner: Arc<dyn Runner>) -> Receiver<PipelineEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let event = match run_inner(&input, runner.as_ref(), &tx) {
            Ok(outcome) => PipelineEvent::Completed(outcome),
            Err(e) => PipelineEvent::Aborted(e),
        };
        let _ = tx.send(event);
    });
    rx
}

fn run_inner(
    input: &PipelineInput,
    runner: &dyn Runner,
    tx: &Sender<PipelineEvent>,
) -> Result<PipelineOutcome> {
    let cfg = &input.config;
    let url_list = write_url_list(&input.urls)?;
    debug!(path = %url_list.path().display(), urls = input.urls.len(), "wrote URL list");

    let flavor = docker::resolve_flavor(cfg.compose, runner);
    debug!(flavor = flavor.as_str(), "compose front-end");
    let compose = Compose::new(
        flavor,
        config::resolve(&input.work_dir, &cfg.compose_file),
        cfg.project.clone(),
        input.timing.command_timeout,
    );
    let output_dir = config::resolve(&input.work_dir, &cfg.output_dir);
    let report_path = config::resolve(&input.work_dir, &cfg.report_path());
    let steps = Steps { runner, tx };

    // ── Reset ────────────────────────────────────────────────────────
    steps.best_effort(Phase::Reset, compose.down(true));

    let driven = drive(&steps, &compose, input, url_list.path(), &output_dir, &report_path);

    // ── Shutdown (every path past reset) ────────────────────────────
    steps.best_effort(Phase::Shutdown, compose.down(false));

    let waited = driven?;
    finish(input, &output_dir, report_path, waited)
}

/// Start, readiness, inject, wait for the marker, collect.
fn drive(
    steps: &Steps<'_>,
    compose: &Compose,
    input: &PipelineInput,
    url_list: &Path,
    output_dir: &Path,
    report_path: &Path,
) -> Result<Duration> {
    let cfg = &input.config;
    let timing = &input.timing;

    // ── Start ────────────────────────────────────────────────────────
    steps.required(Phase::Start, compose.up_build())?;

    // ── Readiness ────────────────────────────────────────────────────
    steps.started(Phase::AwaitReady);
    let ready = poll_until(timing.ready_interval, timing.ready_deadline, |elapsed| {
        let running = docker::capture(steps.runner, compose.running_services())
            .map(|r| r.success && docker::parse_services(&r.log).contains(&cfg.fetcher_service))
            .unwrap_or(false);
        if !running {
            steps.waiting(Phase::AwaitReady, elapsed);
        }
        running
    });
    steps.finished(Phase::AwaitReady, ready.is_some());
    if ready.is_none() {
        return Err(RunError::NotReady {
            service: cfg.fetcher_service.clone(),
            waited: timing.ready_deadline,
        });
    }

    // ── Inject ───────────────────────────────────────────────────────
    steps.required(
        Phase::Inject,
        compose.copy_in(url_list, &cfg.fetcher_service, &cfg.url_list_target),
    )?;

    // ── Await marker ─────────────────────────────────────────────────
    let staging = tempfile::Builder::new()
        .prefix("fetchpipe-marker-")
        .tempdir()
        .map_err(|e| RunError::io("creating marker staging directory", e))?;
    let staged_marker = staging.path().join(&cfg.report_name);
    steps.started(Phase::AwaitMarker);
    info!(
        service = %cfg.analyzer_service,
        marker = %cfg.marker_path,
        timeout_secs = timing.deadline.as_secs(),
        "waiting for pipeline to complete"
    );
    let found = poll_until(timing.poll_interval, timing.deadline, |elapsed| {
        let present = docker::capture(
            steps.runner,
            compose.check_file(&cfg.analyzer_service, &cfg.marker_path, &staged_marker),
        )
        .map(|r| r.success)
        .unwrap_or(false);
        if !present {
            steps.waiting(Phase::AwaitMarker, elapsed);
        }
        present
    });
    steps.finished(Phase::AwaitMarker, found.is_some());
    let Some(waited) = found else {
        return Err(RunError::Timeout {
            waited: timing.deadline,
        });
    };

    // ── Collect ──────────────────────────────────────────────────────
    steps.started(Phase::Collect);
    std::fs::create_dir_all(output_dir).map_err(|e| {
        RunError::io(
            format!("creating output directory {}", output_dir.display()),
            e,
        )
    })?;
    remove_stale(report_path)?;
    let copied_report = steps.attempt(
        Phase::Collect,
        compose.copy_out(&cfg.analyzer_service, &cfg.marker_path, report_path),
    );
    let copied_status = steps.attempt(
        Phase::Collect,
        compose.copy_out(&cfg.analyzer_service, &cfg.status_dir, output_dir),
    );
    steps.finished(Phase::Collect, copied_report && copied_status);
    if !copied_report {
        return Err(RunError::MissingOutput(report_path.to_path_buf()));
    }

    Ok(waited)
}

/// A report left by an earlier run must not pass for this run's output.
fn remove_stale(report_path: &Path) -> Result<()> {
    match std::fs::remove_file(report_path) {
        Ok(()) => {
            debug!(path = %report_path.display(), "removed previous report");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunError::io(
            format!("removing previous report {}", report_path.display()),
            e,
        )),
    }
}

/// Check the collected report and build the outcome.
fn finish(
    input: &PipelineInput,
    output_dir: &Path,
    report_path: PathBuf,
    waited: Duration,
) -> Result<PipelineOutcome> {
    let cfg = &input.config;
    if !report_path.is_file() {
        return Err(RunError::MissingOutput(report_path));
    }

    let raw = std::fs::read_to_string(&report_path)
        .map_err(|e| RunError::io(format!("reading {}", report_path.display()), e))?;
    let preview = report::preview(&raw, cfg.preview_lines).unwrap_or_else(|e| {
        warn!(error = %e, "report is not valid JSON, showing it verbatim");
        raw.lines().take(cfg.preview_lines).map(str::to_string).collect()
    });
    let report: Option<AnalysisReport> = serde_json::from_str(&raw).ok();
    if let Some(r) = &report {
        info!("{}", r.headline());
    }

    Ok(PipelineOutcome {
        report_path,
        preview,
        report,
        status_files: report::list_artifacts(&status_copy(output_dir, &cfg.status_dir)),
        waited,
    })
}

/// Where `compose cp <svc>:<status_dir> <output_dir>` lands on the host.
fn status_copy(output_dir: &Path, status_dir: &str) -> PathBuf {
    match Path::new(status_dir.trim_end_matches('/')).file_name() {
        Some(name) => output_dir.join(name),
        None => output_dir.to_path_buf(),
    }
}

/// Call `probe` until it returns `true` or `deadline` passes, sleeping
/// `interval` between attempts. The probe always runs at least once.
///
/// Returns the elapsed time at the successful probe.
pub(crate) fn poll_until(
    interval: Duration,
    deadline: Duration,
    mut probe: impl FnMut(Duration) -> bool,
) -> Option<Duration> {
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if probe(elapsed) {
            return Some(elapsed);
        }
        if elapsed >= deadline {
            return None;
        }
        std::thread::sleep(interval.min(deadline - elapsed));
    }
}

/// Runs compose steps and reports them on the event channel.
struct Steps<'a> {
    runner: &'a dyn Runner,
    tx: &'a Sender<PipelineEvent>,
}

impl Steps<'_> {
    fn started(&self, phase: Phase) {
        debug!(%phase, "phase started");
        let _ = self.tx.send(PipelineEvent::PhaseStarted(phase));
    }

    fn finished(&self, phase: Phase, success: bool) {
        debug!(%phase, success, "phase finished");
        let _ = self.tx.send(PipelineEvent::PhaseFinished { phase, success });
    }

    fn waiting(&self, phase: Phase, elapsed: Duration) {
        let _ = self.tx.send(PipelineEvent::Waiting { phase, elapsed });
    }

    fn exec(&self, phase: Phase, cmd: ContainerCommand) -> anyhow::Result<ContainerResult> {
        debug!(%phase, command = %cmd.display(), "running");
        docker::run_to_end(self.runner, cmd, |line| {
            let _ = self.tx.send(PipelineEvent::Log {
                phase,
                line: line.to_string(),
            });
        })
    }

    /// Run one command inside an already-started phase. Failure is logged.
    fn attempt(&self, phase: Phase, cmd: ContainerCommand) -> bool {
        let rendered = cmd.display();
        match self.exec(phase, cmd) {
            Ok(r) if r.success => true,
            Ok(r) => {
                warn!(%phase, command = %rendered, reason = %failure_reason(&r), "step failed");
                false
            }
            Err(e) => {
                warn!(%phase, command = %rendered, error = %e, "step failed");
                false
            }
        }
    }

    /// A phase whose failure is tolerated.
    fn best_effort(&self, phase: Phase, cmd: ContainerCommand) -> bool {
        self.started(phase);
        let ok = self.attempt(phase, cmd);
        self.finished(phase, ok);
        ok
    }

    /// A phase whose failure aborts the run.
    fn required(&self, phase: Phase, cmd: ContainerCommand) -> Result<()> {
        self.started(phase);
        let step = cmd.display();
        let outcome = self.exec(phase, cmd);
        let success = matches!(&outcome, Ok(r) if r.success);
        self.finished(phase, success);
        match outcome {
            Ok(r) if r.success => Ok(()),
            Ok(r) => Err(RunError::Compose {
                step,
                reason: failure_reason(&r),
            }),
            Err(e) => Err(RunError::Compose {
                step,
                reason: format!("{e:#}"),
            }),
        }
    }
}

/// Last non-empty output line, or the exit status if there was none.
fn failure_reason(result: &ContainerResult) -> String {
    if result.timed_out {
        return "timed out".to_string();
    }
    result
        .log
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match result.exit_code {
            Some(code) => format!("exit {code}"),
            None => "killed by signal".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComposeFlavor, PipelineConfig, Timing};
    use crate::docker::runner::fake::{FakeRunner, Reply};

    fn fast_timing() -> Timing {
        Timing {
            poll_interval: Duration::from_millis(5),
            deadline: Duration::from_millis(60),
            ready_interval: Duration::from_millis(5),
            ready_deadline: Duration::from_millis(60),
            command_timeout: Duration::from_secs(5),
        }
    }

    fn input(work_dir: &Path) -> PipelineInput {
        PipelineInput {
            urls: vec!["https://example.com".into(), "https://example.org".into()],
            config: PipelineConfig {
                compose: ComposeFlavor::Plugin,
                ..PipelineConfig::default()
            },
            timing: fast_timing(),
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn collect(rx: Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        rx.iter().collect()
    }

    fn has(cmd: &ContainerCommand, word: &str) -> bool {
        cmd.args.iter().any(|a| a == word)
    }

    #[test]
    fn poll_until_returns_on_first_success() {
        let mut calls = 0;
        let hit = poll_until(Duration::from_millis(1), Duration::from_secs(1), |_| {
            calls += 1;
            calls == 3
        });
        assert!(hit.is_some());
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_until_gives_up_after_deadline() {
        let start = Instant::now();
        let hit = poll_until(Duration::from_millis(5), Duration::from_millis(30), |_| false);
        assert!(hit.is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn poll_until_probes_once_with_zero_deadline() {
        let mut calls = 0;
        let hit = poll_until(Duration::from_secs(5), Duration::ZERO, |_| {
            calls += 1;
            false
        });
        assert!(hit.is_none());
        assert_eq!(calls, 1);
    }

    #[test]
    fn status_copy_uses_last_component() {
        assert_eq!(
            status_copy(Path::new("out"), "/shared/status"),
            PathBuf::from("out/status")
        );
        assert_eq!(
            status_copy(Path::new("out"), "/shared/status/"),
            PathBuf::from("out/status")
        );
    }

    #[test]
    fn failure_reason_prefers_last_output_line() {
        let r = ContainerResult {
            log: "building\nno such service: fetcher\n\n".into(),
            exit_code: Some(1),
            ..ContainerResult::default()
        };
        assert_eq!(failure_reason(&r), "no such service: fetcher");
        let r = ContainerResult {
            exit_code: Some(3),
            ..ContainerResult::default()
        };
        assert_eq!(failure_reason(&r), "exit 3");
    }

    #[test]
    fn failed_start_aborts_and_still_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(|cmd| {
            if has(cmd, "up") {
                Reply::exit(1).with_lines(&["build failed"])
            } else {
                Reply::ok()
            }
        }));
        let events = collect(run_pipeline(input(dir.path()), runner.clone()));

        match events.last() {
            Some(PipelineEvent::Aborted(RunError::Compose { reason, .. })) => {
                assert_eq!(reason, "build failed")
            }
            other => panic!("expected Compose abort, got {other:?}"),
        }
        let rendered = runner.rendered();
        assert!(rendered.last().unwrap().ends_with(" down"));
        assert!(!rendered.iter().any(|c| c.contains(" cp ")));
    }

    #[test]
    fn never_ready_fetcher_aborts_before_inject() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(|cmd| {
            if has(cmd, "ps") {
                Reply::ok().with_lines(&["analyzer"])
            } else {
                Reply::ok()
            }
        }));
        let events = collect(run_pipeline(input(dir.path()), runner.clone()));

        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Aborted(RunError::NotReady { .. }))
        ));
        let rendered = runner.rendered();
        assert!(!rendered.iter().any(|c| c.contains(" cp ")));
        assert!(rendered.last().unwrap().ends_with(" down"));
    }

    #[test]
    fn marker_present_but_copy_missing_reports_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(|cmd| {
            if has(cmd, "ps") {
                Reply::ok().with_lines(&["fetcher", "analyzer"])
            } else {
                Reply::ok()
            }
        }));
        let events = collect(run_pipeline(input(dir.path()), runner));
        match events.last() {
            Some(PipelineEvent::Aborted(RunError::MissingOutput(path))) => {
                assert_eq!(path, &dir.path().join("output/final_report.json"))
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
        assert!(dir.path().join("output").is_dir());
    }

    #[test]
    fn failed_report_copy_does_not_reuse_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        std::fs::create_dir_all(&output).unwrap();
        let stale = output.join("final_report.json");
        std::fs::write(&stale, r#"{"documents_processed": 99}"#).unwrap();

        // The marker copy into staging works; copies into the output dir fail.
        let target = output.clone();
        let runner = Arc::new(FakeRunner::new(move |cmd| {
            let dest = cmd.args.last().map(Path::new);
            if has(cmd, "ps") {
                Reply::ok().with_lines(&["fetcher"])
            } else if has(cmd, "cp") && dest.is_some_and(|d| d.starts_with(&target)) {
                Reply::exit(1).with_lines(&["no such container"])
            } else {
                Reply::ok()
            }
        }));
        let events = collect(run_pipeline(input(dir.path()), runner.clone()));

        match events.last() {
            Some(PipelineEvent::Aborted(RunError::MissingOutput(path))) => {
                assert_eq!(path, &stale)
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
        assert!(!stale.exists());
        assert!(runner.rendered().last().unwrap().ends_with(" down"));
    }

    #[test]
    fn reset_failure_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(|cmd| {
            if has(cmd, "--remove-orphans") {
                Reply::exit(1).with_lines(&["no such project"])
            } else if has(cmd, "ps") {
                Reply::ok().with_lines(&["fetcher"])
            } else {
                Reply::ok()
            }
        }));
        let events = collect(run_pipeline(input(dir.path()), runner));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::PhaseFinished {
                phase: Phase::Reset,
                success: false
            }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::PhaseFinished {
                phase: Phase::Start,
                success: true
            }
        )));
    }

    #[test]
    fn invalid_urls_abort_before_any_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new(|_| Reply::ok()));
        let mut inp = input(dir.path());
        inp.urls = vec!["a\nb".into()];
        let events = collect(run_pipeline(inp, runner.clone()));
        assert!(matches!(
            events.as_slice(),
            [PipelineEvent::Aborted(RunError::Usage(_))]
        ));
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
