use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::runner::{Runner, capture};
use super::types::ContainerCommand;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Verify that the Docker daemon is reachable.
pub fn ensure_available(runner: &dyn Runner) -> Result<()> {
    let result = capture(
        runner,
        ContainerCommand::docker(
            ["version", "--format", "{{.Server.Version}}"],
            PROBE_TIMEOUT,
        ),
    )
    .context("failed to invoke `docker`, is it installed and on PATH?")?;

    if !result.success {
        bail!(
            "docker daemon is not running (exit {})",
            result
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string())
        );
    }
    debug!(server = result.log.trim(), "docker daemon reachable");
    Ok(())
}

/// Returns `true` if `docker compose` (the CLI plugin) answers.
pub fn has_compose_plugin(runner: &dyn Runner) -> bool {
    let cmd = ContainerCommand::docker(["compose", "version", "--short"], PROBE_TIMEOUT);
    capture(runner, cmd).map(|r| r.success).unwrap_or(false)
}

/// Major version of a standalone `docker-compose` binary, if one answers.
pub fn standalone_compose_major(runner: &dyn Runner) -> Option<u32> {
    let cmd = ContainerCommand {
        program: "docker-compose".into(),
        args: vec!["version".into(), "--short".into()],
        timeout: PROBE_TIMEOUT,
    };
    let result = capture(runner, cmd).ok().filter(|r| r.success)?;
    let major = parse_major(&result.log);
    debug!(version = result.log.trim(), ?major, "standalone docker-compose found");
    major
}

/// `"v2.24.6\n"` and `"1.29.2, build 5becea4c"` style version strings.
fn parse_major(version: &str) -> Option<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split(['.', ',', ' '])
        .next()?
        .parse()
        .ok()
}

/// Returns `["--user", "uid:gid"]` on Unix so containers write files
/// as the invoking user. Empty on other platforms.
pub fn user_args() -> Vec<String> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() and getegid() are simple POSIX getters that always succeed and have no side effects.
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        vec!["--user".into(), format!("{uid}:{gid}")]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}
