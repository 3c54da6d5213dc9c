use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ComposeFlavor;

use super::engine;
use super::runner::Runner;
use super::types::ContainerCommand;

/// Ceiling for the quick status queries (`ps`, marker copies).
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds compose invocations for one project definition.
#[derive(Debug, Clone)]
pub struct Compose {
    program: String,
    prefix: Vec<String>,
    file: PathBuf,
    project: Option<String>,
    timeout: Duration,
}

impl Compose {
    /// `flavor` must already be resolved; see [`resolve_flavor`].
    pub fn new(
        flavor: ComposeFlavor,
        file: impl Into<PathBuf>,
        project: Option<String>,
        timeout: Duration,
    ) -> Self {
        let (program, prefix) = match flavor {
            ComposeFlavor::Standalone => ("docker-compose", Vec::new()),
            ComposeFlavor::Plugin | ComposeFlavor::Auto => ("docker", vec!["compose".to_string()]),
        };
        Self {
            program: program.to_string(),
            prefix,
            file: file.into(),
            project,
            timeout,
        }
    }

    fn command(&self, args: &[&str], timeout: Duration) -> ContainerCommand {
        let mut full = self.prefix.clone();
        full.extend(["-f".to_string(), self.file.display().to_string()]);
        if let Some(project) = &self.project {
            full.extend(["-p".to_string(), project.clone()]);
        }
        full.extend(args.iter().map(|a| a.to_string()));
        ContainerCommand {
            program: self.program.clone(),
            args: full,
            timeout,
        }
    }

    /// `down`, optionally removing volumes and orphans as well.
    pub fn down(&self, purge: bool) -> ContainerCommand {
        if purge {
            self.command(&["down", "-v", "--remove-orphans"], self.timeout)
        } else {
            self.command(&["down"], self.timeout)
        }
    }

    pub fn up_build(&self) -> ContainerCommand {
        self.command(&["up", "-d", "--build"], self.timeout)
    }

    /// Lists the services currently running, one per line.
    pub fn running_services(&self) -> ContainerCommand {
        self.command(&["ps", "--status", "running", "--services"], PROBE_TIMEOUT)
    }

    pub fn copy_in(&self, src: &Path, service: &str, dest: &str) -> ContainerCommand {
        let src = src.display().to_string();
        let target = format!("{service}:{dest}");
        self.command(&["cp", &src, &target], self.timeout)
    }

    pub fn copy_out(&self, service: &str, src: &str, dest: &Path) -> ContainerCommand {
        self.cp_out(service, src, dest, self.timeout)
    }

    /// Copies `path` out of `service`; exits 0 iff it exists. Unlike `exec`
    /// this also works once the service's container has exited.
    pub fn check_file(&self, service: &str, path: &str, dest: &Path) -> ContainerCommand {
        self.cp_out(service, path, dest, PROBE_TIMEOUT)
    }

    fn cp_out(&self, service: &str, src: &str, dest: &Path, timeout: Duration) -> ContainerCommand {
        let source = format!("{service}:{src}");
        let dest = dest.display().to_string();
        self.command(&["cp", &source, &dest], timeout)
    }
}

/// Turn [`ComposeFlavor::Auto`] into a concrete front-end.
///
/// The plugin wins when it answers. A standalone binary is only chosen when
/// it is v2, since v1 lacks `cp` and `ps --status`.
pub fn resolve_flavor(flavor: ComposeFlavor, runner: &dyn Runner) -> ComposeFlavor {
    match flavor {
        ComposeFlavor::Auto if engine::has_compose_plugin(runner) => ComposeFlavor::Plugin,
        ComposeFlavor::Auto if engine::standalone_compose_major(runner) >= Some(2) => {
            ComposeFlavor::Standalone
        }
        ComposeFlavor::Auto => ComposeFlavor::Plugin,
        other => other,
    }
}

/// Parse the output of [`Compose::running_services`].
pub fn parse_services(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
