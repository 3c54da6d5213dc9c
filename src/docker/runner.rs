use std::sync::mpsc::Receiver;

use anyhow::{Result, bail};

use super::run;
use super::types::{ContainerCommand, ContainerResult, OutputLine};

/// Seam between the runners and the process table. Production code goes
/// through [`ProcessRunner`]; tests substitute a scripted implementation.
pub trait Runner: Send + Sync {
    fn spawn(&self, cmd: ContainerCommand) -> Result<Receiver<OutputLine>>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn spawn(&self, cmd: ContainerCommand) -> Result<Receiver<OutputLine>> {
        run::spawn(cmd)
    }
}

/// Run a command to completion, handing every output line to `on_line`.
pub fn run_to_end(
    runner: &dyn Runner,
    cmd: ContainerCommand,
    mut on_line: impl FnMut(&str),
) -> Result<ContainerResult> {
    let rx = runner.spawn(cmd)?;
    for line in rx {
        match line {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => on_line(&s),
            OutputLine::Done(result) => return Ok(result),
        }
    }
    bail!("command output stream closed before the command finished")
}

/// Run a command to completion and keep only its result.
pub fn capture(runner: &dyn Runner, cmd: ContainerCommand) -> Result<ContainerResult> {
    run_to_end(runner, cmd, |_| {})
}
