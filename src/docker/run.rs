use std::io::BufRead;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::types::{ContainerCommand, ContainerResult, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn a command and return a channel that streams its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`Stderr`] as they arrive,
/// followed by exactly one [`OutputLine::Done`] carrying the final result.
pub fn spawn(cmd: ContainerCommand) -> Result<Receiver<OutputLine>> {
    debug!(command = %cmd.display(), "spawning");

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", cmd.program))?;

    let stdout = child.stdout.take().context("child stdout was not piped")?;
    let stderr = child.stderr.take().context("child stderr was not piped")?;

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        orchestrate(child, stdout, stderr, tx, cmd.timeout);
    });

    Ok(rx)
}

fn orchestrate(
    mut child: std::process::Child,
    stdout: std::process::ChildStdout,
    stderr: std::process::ChildStderr,
    tx: Sender<OutputLine>,
    timeout: Duration,
) {
    // Accumulates all output for ContainerResult::log.
    let log_buf = std::sync::Arc::new(std::sync::Mutex::new(String::new()));

    let stdout_handle = forward_lines(stdout, tx.clone(), log_buf.clone(), OutputLine::Stdout);
    let stderr_handle = forward_lines(stderr, tx.clone(), log_buf.clone(), OutputLine::Stderr);

    // --- poll loop ---------------------------------------------------------
    let start = Instant::now();
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if start.elapsed() > timeout {
            warn!(?timeout, "command exceeded its timeout, killing it");
            timed_out = true;
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    // --- finalize ----------------------------------------------------------
    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let exit_code = exit_status.and_then(|s| s.code());
    let success = exit_code == Some(0);
    let log = log_buf.lock().map(|b| b.clone()).unwrap_or_default();

    let _ = tx.send(OutputLine::Done(ContainerResult {
        success,
        exit_code,
        log,
        timed_out,
    }));
}

fn forward_lines<R>(
    reader: R,
    tx: Sender<OutputLine>,
    buf: std::sync::Arc<std::sync::Mutex<String>>,
    wrap: fn(String) -> OutputLine,
) -> std::thread::JoinHandle<()>
where
    R: std::io::Read + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = std::io::BufReader::new(reader);
        for line in reader.lines() {
            let Ok(l) = line else { break };
            if let Ok(mut buf) = buf.lock() {
                buf.push_str(&l);
                buf.push('\n');
            }
            // Receiver may be dropped; ignore send errors.
            let _ = tx.send(wrap(l));
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ContainerCommand {
        ContainerCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout,
        }
    }

    fn drain(rx: Receiver<OutputLine>) -> (Vec<String>, ContainerResult) {
        let mut lines = Vec::new();
        for ev in rx {
            match ev {
                OutputLine::Stdout(l) | OutputLine::Stderr(l) => lines.push(l),
                OutputLine::Done(result) => return (lines, result),
            }
        }
        panic!("channel closed without Done");
    }

    #[test]
    fn streams_lines_and_reports_exit_code() {
        let rx = spawn(sh("echo one; echo two >&2; exit 3", Duration::from_secs(10))).unwrap();
        let (lines, result) = drain(rx);
        assert!(lines.contains(&"one".to_string()));
        assert!(lines.contains(&"two".to_string()));
        assert_eq!(result.exit_code, Some(3));
        assert!(!result.success);
        assert!(!result.timed_out);
    }

    #[test]
    fn kills_command_after_timeout() {
        let rx = spawn(sh("exec sleep 5", Duration::from_millis(200))).unwrap();
        let (_, result) = drain(rx);
        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn result_log_collects_both_streams() {
        let (_, result) = drain(spawn(sh("echo out; echo err >&2", Duration::from_secs(10))).unwrap());
        assert!(result.success);
        assert!(result.log.contains("out\n"));
        assert!(result.log.contains("err\n"));
    }

    #[test]
    fn spawn_fails_for_missing_program() {
        let cmd = ContainerCommand {
            program: "definitely-not-a-real-binary-xyz".into(),
            args: Vec::new(),
            timeout: Duration::from_secs(1),
        };
        assert!(spawn(cmd).is_err());
    }
}
