// file: src/templates/dedup.rs
// description: removes byte-identical template copies by content digest
// reference: https://docs.rs/sha2

use crate::error::{AggregatorError, Result};
use crate::templates::scanner::TemplateScanner;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub scanned: usize,
    pub removed: usize,
    /// Templates that could not be read or removed. They are left in place.
    pub unreadable: usize,
}

pub fn content_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| AggregatorError::file(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct DuplicateRemover<'a> {
    seen: &'a mut HashSet<String>,
}

impl<'a> DuplicateRemover<'a> {
    /// `seen` may already hold digests; files matching them are removed too.
    pub fn new(seen: &'a mut HashSet<String>) -> Self {
        Self { seen }
    }

    /// Per-file I/O errors are logged and the file is skipped.
    pub fn run(&mut self, scanner: &TemplateScanner) -> DedupStats {
        let mut stats = DedupStats::default();

        for file in scanner.scan() {
            stats.scanned += 1;
            let digest = match content_digest(&file.path) {
                Ok(digest) => digest,
                Err(e) => {
                    warn!("Skipping template: {}", e);
                    stats.unreadable += 1;
                    continue;
                }
            };

            if self.seen.insert(digest) {
                continue;
            }

            debug!("Removing duplicate template {}", file.relative_path.display());
            match fs::remove_file(&file.path) {
                Ok(()) => stats.removed += 1,
                Err(e) => {
                    warn!("Could not remove {}: {}", file.path.display(), e);
                    stats.unreadable += 1;
                }
            }
        }

        info!("Removed {} duplicate templates", stats.removed);
        if stats.unreadable > 0 {
            warn!("{} templates could not be processed and were kept", stats.unreadable);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_identical_copies_collapse_to_one() {
        let temp = TempDir::new().unwrap();
        let body = "id: dup\ninfo:\n  severity: high\n";
        write(temp.path(), "r1/a.yaml", body);
        write(temp.path(), "r2/b.yaml", body);
        write(temp.path(), "r3/deep/c.yml", body);
        let original = content_digest(&temp.path().join("r1/a.yaml")).unwrap();

        let mut seen = HashSet::new();
        let stats = DuplicateRemover::new(&mut seen)
            .run(&TemplateScanner::new(temp.path()));

        let survivors = TemplateScanner::new(temp.path()).scan();
        assert_eq!(stats.removed, 2);
        assert_eq!(survivors.len(), 1);
        assert_eq!(content_digest(&survivors[0].path).unwrap(), original);
    }

    #[test]
    fn test_removed_equals_total_minus_distinct() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "r1/a.yaml", "one");
        write(temp.path(), "r1/b.yaml", "two");
        write(temp.path(), "r2/a.yaml", "one");
        write(temp.path(), "r2/c.yaml", "three");
        write(temp.path(), "r3/d.yaml", "two");

        let mut seen = HashSet::new();
        let stats = DuplicateRemover::new(&mut seen)
            .run(&TemplateScanner::new(temp.path()));

        assert_eq!(stats.scanned, 5);
        assert_eq!(stats.removed, 5 - 3);
        assert_eq!(seen.len(), 3);

        let mut digests: Vec<String> = TemplateScanner::new(temp.path())
            .scan()
            .iter()
            .map(|f| content_digest(&f.path).unwrap())
            .collect();
        digests.sort();
        digests.dedup();
        assert_eq!(digests.len(), 3);
    }

    #[test]
    fn test_seeded_digests_remove_first_occurrence() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "r1/a.yaml", "known");
        let digest = content_digest(&temp.path().join("r1/a.yaml")).unwrap();

        let mut seen = HashSet::from([digest]);
        let stats = DuplicateRemover::new(&mut seen)
            .run(&TemplateScanner::new(temp.path()));

        assert_eq!(stats.removed, 1);
        assert!(!temp.path().join("r1/a.yaml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_template_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        write(temp.path(), "r0/locked.yaml", "locked");
        write(temp.path(), "r1/a.yaml", "same");
        write(temp.path(), "r2/a.yaml", "same");
        let locked = temp.path().join("r0/locked.yaml");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // Privileged users bypass file modes.
            return;
        }

        let mut seen = HashSet::new();
        let stats = DuplicateRemover::new(&mut seen).run(&TemplateScanner::new(temp.path()));

        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unreadable, 1);
        assert!(locked.exists());
    }
}
