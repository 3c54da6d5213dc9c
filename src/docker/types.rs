use std::time::Duration;

/// Describes one invocation of the container tooling. `program` is the
/// executable (`docker` or `docker-compose`) and `args` its full argument list;
/// the callers are responsible for assembling it.
#[derive(Debug, Clone)]
pub struct ContainerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ContainerCommand {
    pub fn docker<I, S>(args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: "docker".into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Space-joined rendering for logs.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        shell_words::join(parts)
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Default)]
pub struct ContainerResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub log: String,
    pub timed_out: bool,
}

/// Streamed output from a running command.
#[derive(Debug)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
    Done(ContainerResult),
}
