//! Pipeline orchestration module.

mod command;
mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::RunReport;
