// file: src/exporter/mod.rs
// description: run report exporters

pub mod report;

pub use report::{ReportExporter, RunReport};
