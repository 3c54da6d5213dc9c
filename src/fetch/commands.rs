use std::path::Path;

use crate::config::FetchConfig;
use crate::docker::{self, ContainerCommand};

/// Build the `docker run` command for one fetch job.
///
/// `input` and `output_dir` must be absolute host paths.
pub fn fetch_command(
    cfg: &FetchConfig,
    input: &Path,
    output_dir: &Path,
    extra_args: Vec<String>,
) -> ContainerCommand {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        cfg.container_name.clone(),
    ];
    if cfg.run_as_user {
        args.extend(docker::user_args());
    }
    args.extend([
        "-v".to_string(),
        format!("{}:{}:ro", input.display(), cfg.input_mount),
        "-v".to_string(),
        format!("{}:{}", output_dir.display(), cfg.output_mount),
    ]);
    args.extend(extra_args);
    args.extend([
        cfg.image.clone(),
        cfg.input_mount.clone(),
        cfg.output_mount.clone(),
    ]);

    ContainerCommand::docker(args, cfg.timeout())
}
