// file: src/pipeline/orchestrator.rs
// description: runs sync, dedup, severity filtering and aggregation in order
// reference: orchestrates the repository sync fan-out and the sequential file passes

use crate::config::Config;
use crate::error::{AggregatorError, Result};
use crate::repository::{FleetReport, FleetUpdater, GitBackend, RepositorySync, SyncMode};
use crate::templates::{
    AggregateReport, Aggregator, DedupStats, DuplicateRemover, SeverityFilter, SeverityStats,
    TemplateCache, TemplateScanner,
};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub dedup: DedupStats,
    pub severity: SeverityStats,
    pub aggregate: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: SyncMode,
    pub fleet: FleetReport,
    #[serde(flatten)]
    pub filters: FilterSummary,
    pub duration_secs: f64,
}

pub struct TemplatePipeline {
    config: Config,
    show_progress: bool,
}

impl TemplatePipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Syncs every repository, then filters and aggregates once all workers
    /// are done.
    pub async fn run<B: GitBackend + 'static>(&self, backend: B, mode: SyncMode) -> Result<RunSummary> {
        let start = Instant::now();
        info!("Starting template aggregation ({:?} mode)", mode);

        let fleet = FleetUpdater::new(
            RepositorySync::new(backend, self.config.workdir.clone()),
            self.config.worker_count(),
        )
        .with_progress(self.show_progress);
        let fleet_report = fleet
            .run(
                &self.config.repositories,
                &self.config.blacklist_set(),
                mode,
            )
            .await;

        let config = self.config.clone();
        let filters = tokio::task::spawn_blocking(move || filter_and_aggregate(&config, mode))
            .await
            .map_err(|e| AggregatorError::Config(format!("Filter task failed: {}", e)))??;

        let summary = RunSummary {
            mode,
            fleet: fleet_report,
            filters,
            duration_secs: start.elapsed().as_secs_f64(),
        };
        log_final_stats(&summary);
        Ok(summary)
    }
}

/// The sequential passes over the working tree. The output directory is
/// never scanned by dedup or the severity filter.
pub fn filter_and_aggregate(config: &Config, mode: SyncMode) -> Result<FilterSummary> {
    let output_dir = config.output_path();
    let scanner = TemplateScanner::new(config.workdir.clone()).exclude(output_dir.clone());

    let mut seen = HashSet::new();
    let dedup = DuplicateRemover::new(&mut seen).run(&scanner);

    let mut cache = TemplateCache::new();
    let severity = SeverityFilter::new(
        config.severity_namespaces.clone(),
        config.low_severity_markers.clone(),
    )
    .run(&scanner, &mut cache);

    let aggregate = Aggregator::new(output_dir)
        .report_new(mode == SyncMode::Update)
        .run(&scanner)?;

    Ok(FilterSummary {
        dedup,
        severity,
        aggregate,
    })
}

fn log_final_stats(summary: &RunSummary) {
    info!("=== Aggregation Summary ===");
    info!("Duration: {:.2} seconds", summary.duration_secs);
    info!(
        "Repositories: {} synced, {} skipped, {} failed",
        summary.fleet.succeeded(),
        summary.fleet.skipped(),
        summary.fleet.failed()
    );
    info!(
        "Duplicates removed: {} of {} scanned",
        summary.filters.dedup.removed, summary.filters.dedup.scanned
    );
    info!(
        "Low-severity templates removed: {}",
        summary.filters.severity.removed
    );
    info!("New templates: {}", summary.filters.aggregate.added.len());
    info!("Unique templates: {}", summary.filters.aggregate.total);
    info!("===========================");
}
