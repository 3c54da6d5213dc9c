mod loader;
mod types;

pub use loader::{DEFAULT_CONFIG_FILE, load, resolve};
pub use types::{ComposeFlavor, Config, FetchConfig, PipelineConfig, Timing};
