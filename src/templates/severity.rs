// file: src/templates/severity.rs
// description: drops low-severity templates from scanner namespaces
// reference: https://docs.rs/yaml-rust

use crate::error::{AggregatorError, Result};
use crate::templates::scanner::{TemplateScanner, in_namespace};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use yaml_rust::{Yaml, YamlLoader};

/// Parsed templates keyed by path. Lives for one run only.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: HashMap<PathBuf, Yaml>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First YAML document of `path`, parsed at most once per cache.
    pub fn load(&mut self, path: &Path) -> Result<&Yaml> {
        if !self.entries.contains_key(path) {
            let content =
                fs::read_to_string(path).map_err(|e| AggregatorError::file(path, e))?;
            let docs =
                YamlLoader::load_from_str(&content).map_err(|e| AggregatorError::YamlParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            let doc = docs.into_iter().next().unwrap_or(Yaml::Null);
            self.entries.insert(path.to_path_buf(), doc);
        }

        Ok(&self.entries[path])
    }
}

/// Severity text under `info.severity`. Sequences are joined with `,`.
/// `None` when the template has no `info` section.
pub fn declared_severity(doc: &Yaml) -> Option<String> {
    let info = &doc["info"];
    if info.is_badvalue() || info.is_null() {
        return None;
    }

    let severity = match &info["severity"] {
        Yaml::String(s) => s.clone(),
        Yaml::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    };
    Some(severity)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityStats {
    pub scanned: usize,
    pub removed: usize,
    pub unparsable: usize,
}

pub struct SeverityFilter {
    namespaces: Vec<String>,
    low_markers: Vec<String>,
}

impl SeverityFilter {
    pub fn new(namespaces: Vec<String>, low_markers: Vec<String>) -> Self {
        Self {
            namespaces,
            low_markers,
        }
    }

    /// Substring match, so `"info,low"` and `"informative"` both count.
    pub fn is_low_value(&self, severity: &str) -> bool {
        self.low_markers
            .iter()
            .any(|marker| !marker.is_empty() && severity.contains(marker.as_str()))
    }

    /// Unparsable or unreadable templates are kept and counted; a failed
    /// removal is logged and the file stays.
    pub fn run(&self, scanner: &TemplateScanner, cache: &mut TemplateCache) -> SeverityStats {
        let mut stats = SeverityStats::default();

        for file in scanner
            .scan()
            .into_iter()
            .filter(|f| in_namespace(&f.relative_path, &self.namespaces))
        {
            stats.scanned += 1;

            let doc = match cache.load(&file.path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Keeping unparsable template: {}", e);
                    stats.unparsable += 1;
                    continue;
                }
            };

            let Some(severity) = declared_severity(doc) else {
                continue;
            };

            if self.is_low_value(&severity) {
                debug!(
                    "Removing {} (severity {:?})",
                    file.relative_path.display(),
                    severity
                );
                match fs::remove_file(&file.path) {
                    Ok(()) => stats.removed += 1,
                    Err(e) => warn!("Could not remove {}: {}", file.path.display(), e),
                }
            }
        }

        info!("Removed {} low-severity templates", stats.removed);
        if stats.unparsable > 0 {
            warn!("{} templates could not be parsed and were kept", stats.unparsable);
        }
        stats
    }
}
