//! Compose pipeline: start the services, hand the fetcher a URL list, wait
//! for the analyzer's report and copy it out.

pub mod orchestrator;
mod types;
mod url_list;

pub use orchestrator::run_pipeline;
pub use types::{Phase, PipelineEvent, PipelineInput, PipelineOutcome};
pub use url_list::write_url_list;
