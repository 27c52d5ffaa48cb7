// file: src/templates/aggregate.rs
// description: rebuilds the flat output directory from surviving templates
// reference: std::fs copy with preserved modification time

use crate::error::{AggregatorError, Result};
use crate::templates::scanner::TemplateScanner;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub total: usize,
    /// Files whose name was absent from the previous aggregate.
    pub added: Vec<String>,
    /// Templates dropped because a file of the same name was already copied.
    pub name_collisions: usize,
}

pub struct Aggregator {
    output_dir: PathBuf,
    report_new: bool,
}

impl Aggregator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            report_new: false,
        }
    }

    /// Log each template that was not part of the previous aggregate.
    pub fn report_new(mut self, report_new: bool) -> Self {
        self.report_new = report_new;
        self
    }

    /// Deletes and recreates the output directory, then copies every template
    /// found by `scanner` into it. The first file seen for a given name wins.
    pub fn run(&self, scanner: &TemplateScanner) -> Result<AggregateReport> {
        let previous = self.existing_names()?;
        self.reset()?;

        let scanner = scanner.clone().exclude(&self.output_dir);
        let mut report = AggregateReport::default();

        for file in scanner.scan() {
            let Some(name) = file.file_name() else {
                continue;
            };
            let destination = self.output_dir.join(name);

            if destination.exists() {
                debug!(
                    "Name collision, keeping earlier copy of {}",
                    name.to_string_lossy()
                );
                report.name_collisions += 1;
                continue;
            }

            if let Err(e) = copy_preserving(&file.path, &destination) {
                warn!("Skipping template: {}", e);
                continue;
            }

            let name = name.to_string_lossy().into_owned();
            if !previous.contains(&name) {
                if self.report_new {
                    info!("New template ({}): {}", report.added.len() + 1, name);
                }
                report.added.push(name);
            }
        }

        report.total = fs::read_dir(&self.output_dir)
            .map_err(|e| AggregatorError::file(&self.output_dir, e))?
            .count();

        info!("Total unique templates: {}", report.total);
        Ok(report)
    }

    fn existing_names(&self) -> Result<HashSet<String>> {
        if !self.output_dir.is_dir() {
            return Ok(HashSet::new());
        }

        let mut names = HashSet::new();
        for entry in
            fs::read_dir(&self.output_dir).map_err(|e| AggregatorError::file(&self.output_dir, e))?
        {
            let entry = entry?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn reset(&self) -> Result<()> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)
                .map_err(|e| AggregatorError::file(&self.output_dir, e))?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| AggregatorError::file(&self.output_dir, e))
    }
}

/// Copies contents and permissions, then carries over the modification time.
/// The copy may be read-only, so its times are set through a read handle.
fn copy_preserving(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).map_err(|e| AggregatorError::file(source, e))?;

    let modified = fs::metadata(source)
        .and_then(|meta| meta.modified())
        .map_err(|e| AggregatorError::file(source, e))?;
    File::open(destination)
        .and_then(|file| file.set_modified(modified))
        .map_err(|e| AggregatorError::file(destination, e))?;

    Ok(())
}
