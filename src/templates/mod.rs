// file: src/templates/mod.rs
// description: template filtering and aggregation phases
// reference: internal module structure

pub mod aggregate;
pub mod dedup;
pub mod scanner;
pub mod severity;

pub use aggregate::{AggregateReport, Aggregator};
pub use dedup::{DedupStats, DuplicateRemover, content_digest};
pub use scanner::{TemplateFile, TemplateScanner, in_namespace, is_template};
pub use severity::{SeverityFilter, SeverityStats, TemplateCache, declared_severity};
