// Container tooling: spawning docker/compose, streaming output, command builders.

pub mod compose;
pub mod engine;
pub mod run;
pub mod runner;
pub mod types;

pub use compose::{Compose, parse_services, resolve_flavor};
pub use engine::{ensure_available, user_args};
pub use runner::{ProcessRunner, Runner, capture, run_to_end};
pub use types::{ContainerCommand, ContainerResult, OutputLine};
