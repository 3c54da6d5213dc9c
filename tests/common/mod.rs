//! Scripted stand-in for the docker CLI.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};

use fetchpipe::docker::{ContainerCommand, ContainerResult, OutputLine, Runner};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Reply to one command: output lines and exit code.
pub struct Reply {
    pub lines: Vec<String>,
    pub exit_code: Option<i32>,
}

impl Reply {
    pub fn exit(code: i32) -> Self {
        Self {
            lines: Vec::new(),
            exit_code: Some(code),
        }
    }

    pub fn ok_with(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exit_code: Some(0),
        }
    }
}

type Script = Box<dyn Fn(&ContainerCommand) -> Reply + Send + Sync>;

pub struct ScriptedRunner {
    script: Script,
    calls: Mutex<Vec<ContainerCommand>>,
}

impl ScriptedRunner {
    pub fn new(script: impl Fn(&ContainerCommand) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ContainerCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of the first call whose args contain all of `words`.
    pub fn position(&self, words: &[&str]) -> Option<usize> {
        self.calls().iter().position(|c| has_all(c, words))
    }

    pub fn count(&self, words: &[&str]) -> usize {
        self.calls().iter().filter(|c| has_all(c, words)).count()
    }
}

impl Runner for ScriptedRunner {
    fn spawn(&self, cmd: ContainerCommand) -> anyhow::Result<Receiver<OutputLine>> {
        let reply = (self.script)(&cmd);
        self.calls.lock().unwrap().push(cmd);
        let (tx, rx) = mpsc::channel();
        let mut log = String::new();
        for line in reply.lines {
            log.push_str(&line);
            log.push('\n');
            let _ = tx.send(OutputLine::Stdout(line));
        }
        let _ = tx.send(OutputLine::Done(ContainerResult {
            success: reply.exit_code == Some(0),
            exit_code: reply.exit_code,
            log,
            timed_out: false,
        }));
        Ok(rx)
    }
}

pub fn has_all(cmd: &ContainerCommand, words: &[&str]) -> bool {
    words.iter().all(|w| cmd.args.iter().any(|a| a == w))
}

/// Emulates `compose cp <svc>:<src> <dest>` for the analyzer's artifacts.
pub fn emulate_copy_out(cmd: &ContainerCommand, report: &Path) {
    let n = cmd.args.len();
    let (src, dest) = (&cmd.args[n - 2], Path::new(&cmd.args[n - 1]));
    if src.ends_with("final_report.json") {
        std::fs::copy(report, dest).unwrap();
    } else if src.ends_with("/status") {
        let status = dest.join("status");
        std::fs::create_dir_all(&status).unwrap();
        std::fs::write(status.join("fetch_complete.json"), "{}").unwrap();
        std::fs::write(status.join("process_complete.json"), "{}").unwrap();
    }
}
