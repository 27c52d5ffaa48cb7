// file: src/exporter/report.rs
// description: json run report export

use crate::error::{AggregatorError, Result};
use crate::pipeline::RunSummary;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: String,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

#[derive(Debug, Clone)]
pub struct ReportExporter {
    path: PathBuf,
    pretty: bool,
}

impl ReportExporter {
    pub fn new(path: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export(&self, summary: &RunSummary) -> Result<()> {
        let report = RunReport {
            generated_at: Utc::now().to_rfc3339(),
            summary,
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| AggregatorError::file(parent, e))?;
        }
        fs::write(&self.path, json).map_err(|e| AggregatorError::file(&self.path, e))?;

        info!("Run report written to {}", self.path.display());
        Ok(())
    }
}
