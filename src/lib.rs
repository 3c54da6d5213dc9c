pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use error::{Result, RunError};
