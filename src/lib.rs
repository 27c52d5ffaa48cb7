// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod exporter;
pub mod hosting;
pub mod pipeline;
pub mod repository;
pub mod templates;
pub mod utils;

pub use config::Config;
pub use error::{AggregatorError, Result};
pub use exporter::{ReportExporter, RunReport};
pub use hosting::{HostingClient, RepoStatus};
pub use pipeline::{FilterSummary, RunSummary, SyncCounts, SyncProgress, TemplatePipeline};
pub use repository::{
    FleetReport, FleetUpdater, GitBackend, GixBackend, RepoState, RepositorySync, SyncMode,
    SyncOutcome, SyncResult, local_repo_name,
};
pub use templates::{
    AggregateReport, Aggregator, DedupStats, DuplicateRemover, SeverityFilter, SeverityStats,
    TemplateCache, TemplateScanner,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _config = Config::default_config();
        let _scanner = TemplateScanner::new(".");
    }
}
