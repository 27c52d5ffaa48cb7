// file: src/templates/scanner.rs
// description: Directory walking and template discovery with filtering
// reference: https://docs.rs/walkdir

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Finds YAML templates below a root, skipping `.git` and excluded subtrees.
#[derive(Debug, Clone)]
pub struct TemplateScanner {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
}

impl TemplateFile {
    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

pub fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

impl TemplateScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Leaves `dir` and everything below it out of every scan.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// Templates in file-name order, so repeated runs over the same tree
    /// visit files identically.
    pub fn scan(&self) -> Vec<TemplateFile> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.should_skip_dir(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_template(entry.path()) {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();

            files.push(TemplateFile {
                path: entry.path().to_path_buf(),
                relative_path,
            });
        }

        debug!(
            "Found {} templates under {}",
            files.len(),
            self.root.display()
        );
        files
    }

    fn should_skip_dir(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            return false;
        }

        entry.file_name() == ".git" || self.excluded.iter().any(|dir| entry.path() == dir.as_path())
    }
}

/// True when a directory component of `relative` is exactly one of the
/// namespace names. The file name itself is not considered.
pub fn in_namespace(relative: &Path, namespaces: &[String]) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };

    parent.components().any(|component| {
        let component = component.as_os_str();
        namespaces
            .iter()
            .any(|name| !name.is_empty() && component == name.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "id: x\n").unwrap();
    }

    #[test]
    fn test_scan_finds_yaml_and_yml() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "repo/a.yaml");
        touch(temp.path(), "repo/nested/b.yml");
        touch(temp.path(), "repo/c.YAML");
        touch(temp.path(), "repo/readme.md");

        let files = TemplateScanner::new(temp.path()).scan();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.path.starts_with(temp.path())));
    }

    #[test]
    fn test_scan_skips_git_and_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "repo/.git/hooks/x.yaml");
        touch(temp.path(), "ALL/copy.yaml");
        touch(temp.path(), "repo/keep.yaml");

        let files = TemplateScanner::new(temp.path())
            .exclude(temp.path().join("ALL"))
            .scan();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, Path::new("repo/keep.yaml"));
    }

    #[test]
    fn test_namespace_matching() {
        let namespaces = vec!["nuclei_".to_string()];

        assert!(in_namespace(
            Path::new("projectdiscovery_nuclei_templates/nuclei_/http/cve.yaml"),
            &namespaces
        ));
        assert!(in_namespace(Path::new("nuclei_/x.yaml"), &namespaces));
        assert!(!in_namespace(
            Path::new("projectdiscovery_nuclei_templates/http/cve.yaml"),
            &namespaces
        ));
        assert!(!in_namespace(Path::new("someone_nuclei_mirror/low.yaml"), &namespaces));
        assert!(!in_namespace(Path::new("other_repo/cve.yaml"), &namespaces));
        assert!(!in_namespace(Path::new("nuclei_top.yaml"), &namespaces));
    }
}
