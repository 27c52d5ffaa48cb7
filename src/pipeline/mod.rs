// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
pub mod progress;

pub use orchestrator::{FilterSummary, RunSummary, TemplatePipeline, filter_and_aggregate};
pub use progress::{SyncCounts, SyncProgress};
