// file: src/pipeline/progress.rs
// description: progress tracking for the repository sync phase
// reference: uses indicatif for progress bars and tracks per-outcome counters

use crate::repository::sync::{SyncOutcome, SyncResult};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncCounts {
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        let attempted = self.synced + self.failed;
        if attempted == 0 {
            return 0.0;
        }
        (self.synced as f64 / attempted as f64) * 100.0
    }
}

pub struct SyncProgress {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    synced: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl SyncProgress {
    pub fn new(total_repositories: usize, visible: bool) -> Self {
        let (main_bar, detail_bar) = if visible {
            let multi_progress = MultiProgress::new();
            (
                create_progress_bar(&multi_progress, total_repositories as u64),
                create_detail_bar(&multi_progress),
            )
        } else {
            (ProgressBar::hidden(), ProgressBar::hidden())
        };

        Self {
            main_bar,
            detail_bar,
            synced: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, result: &SyncResult) {
        let counter = match result.outcome {
            SyncOutcome::Synced => &self.synced,
            SyncOutcome::Skipped { .. } => &self.skipped,
            SyncOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.main_bar.set_message(result.local_name.clone());
        self.update_detail_bar();
    }

    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            synced: self.synced.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message(format!(
            "Sync complete ({:.0}% of attempted repositories succeeded)",
            self.counts().success_rate()
        ));
        self.detail_bar.finish_and_clear();
    }

    fn update_detail_bar(&self) {
        let counts = self.counts();
        self.detail_bar.set_message(format!(
            "Synced: {} | Skipped: {} | Failed: {}",
            counts.synced, counts.skipped, counts.failed
        ));
    }
}

impl Drop for SyncProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        bar.set_style(style.progress_chars("█▓▒░"));
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}
