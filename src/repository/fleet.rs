// file: src/repository/fleet.rs
// description: fans repository synchronization out over a bounded worker pool
// reference: https://docs.rs/futures

use crate::pipeline::progress::SyncProgress;
use crate::repository::sync::{GitBackend, RepositorySync, SyncMode, SyncOutcome, SyncResult};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetReport {
    /// One entry per attempted repository, in input order.
    pub results: Vec<SyncResult>,
}

impl FleetReport {
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Failed { .. }))
            .count()
    }
}

pub struct FleetUpdater<B> {
    sync: Arc<RepositorySync<B>>,
    workers: usize,
    show_progress: bool,
}

impl<B: GitBackend + 'static> FleetUpdater<B> {
    pub fn new(sync: RepositorySync<B>, workers: usize) -> Self {
        Self {
            sync: Arc::new(sync),
            workers: workers.max(1),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Synchronizes every non-blacklisted URL. Returns once every worker has
    /// finished; one repository failing never stops the others.
    pub async fn run(
        &self,
        repositories: &[String],
        blacklist: &HashSet<String>,
        mode: SyncMode,
    ) -> FleetReport {
        let targets: Vec<String> = repositories
            .iter()
            .filter(|url| !blacklist.contains(url.as_str()))
            .cloned()
            .collect();

        info!(
            "Synchronizing {} repositories ({} blacklisted) with {} workers",
            targets.len(),
            repositories.len() - targets.len(),
            self.workers
        );

        let progress = Arc::new(SyncProgress::new(targets.len(), self.show_progress));

        let mut indexed = stream::iter(targets.into_iter().enumerate().map(|(index, url)| {
            let sync = Arc::clone(&self.sync);
            let progress = Arc::clone(&progress);

            async move {
                let task_url = url.clone();
                let result = match tokio::task::spawn_blocking(move || sync.sync(&task_url, mode))
                    .await
                {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Sync task for {} panicked: {}", url, e);
                        SyncResult {
                            local_name: crate::repository::local_repo_name(&url),
                            url,
                            outcome: SyncOutcome::Failed {
                                reason: e.to_string(),
                            },
                        }
                    }
                };
                progress.record(&result);
                (index, result)
            }
        }))
        .buffer_unordered(self.workers)
        .collect::<Vec<_>>()
        .await;

        progress.finish();

        indexed.sort_by_key(|(index, _)| *index);
        let results = indexed.into_iter().map(|(_, result)| result).collect();

        let report = FleetReport { results };
        info!(
            "Successfully processed {} of {} repositories ({} skipped, {} failed)",
            report.succeeded(),
            report.attempted(),
            report.skipped(),
            report.failed()
        );
        report
    }
}
