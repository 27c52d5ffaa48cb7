// file: src/repository/sync.rs
// description: Repository synchronization using gix
// reference: https://docs.rs/gix

use crate::error::{AggregatorError, Result};
use crate::repository::naming::local_repo_name;
use gix::interrupt::IS_INTERRUPTED;
use gix::progress::Discard;
use gix::refs::transaction::PreviousValue;
use gix::remote::Direction;
use serde::Serialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Source-control operations the synchronizer depends on.
pub trait GitBackend: Send + Sync {
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()>;
    fn pull(&self, repo_path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Clone,
    Update,
}

/// Local checkout state of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Absent,
    Present,
}

impl RepoState {
    pub fn of(path: &Path) -> Self {
        if path.exists() {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
    Synced,
    Skipped { reason: String },
    Failed { reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub url: String,
    pub local_name: String,
    pub outcome: SyncOutcome,
}

pub struct RepositorySync<B> {
    backend: B,
    workdir: PathBuf,
}

impl<B: GitBackend> RepositorySync<B> {
    pub fn new(backend: B, workdir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            workdir: workdir.into(),
        }
    }

    pub fn local_path(&self, url: &str) -> PathBuf {
        self.workdir.join(local_repo_name(url))
    }

    /// Applies `mode` to the repository behind `url`. Never fails: backend
    /// errors are logged and folded into [`SyncOutcome::Failed`].
    pub fn sync(&self, url: &str, mode: SyncMode) -> SyncResult {
        let local_name = local_repo_name(url);
        let path = self.local_path(url);

        let outcome = match (mode, RepoState::of(&path)) {
            (SyncMode::Clone, RepoState::Present) => {
                warn!("Repository {} already exists, skipping clone", local_name);
                SyncOutcome::Skipped {
                    reason: "already exists".to_string(),
                }
            }
            (SyncMode::Update, RepoState::Absent) => {
                warn!("Repository {} does not exist, skipping update", local_name);
                SyncOutcome::Skipped {
                    reason: "does not exist".to_string(),
                }
            }
            (SyncMode::Clone, RepoState::Absent) => {
                Self::fold(url, self.backend.clone_repo(url, &path))
            }
            (SyncMode::Update, RepoState::Present) => Self::fold(url, self.backend.pull(&path)),
        };

        SyncResult {
            url: url.to_string(),
            local_name,
            outcome,
        }
    }

    fn fold(url: &str, result: Result<()>) -> SyncOutcome {
        match result {
            Ok(()) => SyncOutcome::Synced,
            Err(e) => {
                error!("Failed to process {}: {}", url, e);
                SyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Network-backed implementation on top of gix.
#[derive(Debug, Clone)]
pub struct GixBackend {
    depth: Option<NonZeroU32>,
}

impl GixBackend {
    /// `depth == 0` fetches full history.
    pub fn new(depth: u32) -> Self {
        Self {
            depth: NonZeroU32::new(depth),
        }
    }
}

fn sync_err(context: &str, err: impl std::fmt::Display) -> AggregatorError {
    AggregatorError::RepositorySync(format!("{}: {}", context, err))
}

impl GitBackend for GixBackend {
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        info!("Cloning repository from {}", url);

        let mut prepare =
            gix::prepare_clone(url, destination).map_err(|e| sync_err("Clone failed", e))?;

        if let Some(depth) = self.depth {
            prepare = prepare.with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(depth));
        }

        let (mut checkout, _) = prepare
            .fetch_then_checkout(Discard, &IS_INTERRUPTED)
            .map_err(|e| sync_err("Fetch failed", e))?;

        let (repo, _) = checkout
            .main_worktree(Discard, &IS_INTERRUPTED)
            .map_err(|e| sync_err("Checkout failed", e))?;

        debug!("Cloned into {}", repo.path().display());
        Ok(())
    }

    fn pull(&self, repo_path: &Path) -> Result<()> {
        let repo = gix::open(repo_path).map_err(|e| sync_err("Failed to open repo", e))?;
        fast_forward(repo)
    }
}

/// Fetches the default remote and fast-forwards the checked-out branch,
/// removing worktree files that the new commit no longer tracks.
fn fast_forward(mut repo: gix::Repository) -> Result<()> {
    // Ref updates write reflog entries, which need a committer even when none
    // is configured.
    repo.committer_or_set_generic_fallback()
        .map_err(|e| sync_err("Failed to set committer", e))?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| sync_err("Checkout failed", "bare repository"))?
        .to_path_buf();

    let remote = repo
        .find_default_remote(Direction::Fetch)
        .ok_or_else(|| sync_err("Failed to find remote", "no fetch remote configured"))?
        .map_err(|e| sync_err("Failed to find remote", e))?;
    let remote_name = remote
        .name()
        .map(|name| name.as_bstr().to_string())
        .unwrap_or_else(|| "origin".to_string());

    debug!("Fetching latest changes into {}", workdir.display());
    remote
        .connect(Direction::Fetch)
        .map_err(|e| sync_err("Connect failed", e))?
        .prepare_fetch(Discard, Default::default())
        .map_err(|e| sync_err("Fetch failed", e))?
        .receive(Discard, &IS_INTERRUPTED)
        .map_err(|e| sync_err("Fetch failed", e))?;

    let head_name = repo
        .head_name()
        .map_err(|e| sync_err("Failed to read HEAD", e))?
        .ok_or_else(|| sync_err("Failed to read HEAD", "detached HEAD"))?;
    let branch = head_name.shorten().to_string();
    let tracking = format!("refs/remotes/{}/{}", remote_name, branch);

    let target = repo
        .find_reference(tracking.as_str())
        .map_err(|e| sync_err("Failed to find tracking branch", e))?
        .into_fully_peeled_id()
        .map_err(|e| sync_err("Failed to resolve tracking branch", e))?
        .detach();
    let current = repo
        .head_id()
        .map_err(|e| sync_err("Failed to resolve HEAD", e))?
        .detach();

    if current == target {
        debug!("Repository {} is up to date", workdir.display());
        return Ok(());
    }

    let base = repo
        .merge_base(current, target)
        .map_err(|e| sync_err("Merge analysis failed", e))?;
    if base.detach() != current {
        return Err(sync_err(
            "Pull failed",
            format!("{} has diverged from {}", branch, tracking),
        ));
    }

    let old_index = index_at(&repo, current)?;
    let mut index = index_at(&repo, target)?;
    let retired: Vec<PathBuf> = old_index
        .entries()
        .iter()
        .map(|entry| entry.path(&old_index))
        .filter(|path| index.entry_by_path(path).is_none())
        .map(|path| workdir.join(gix::path::from_bstr(path)))
        .collect();

    repo.reference(
        head_name,
        target,
        PreviousValue::MustExistAndMatch(gix::refs::Target::Object(current)),
        "pull: fast-forward",
    )
    .map_err(|e| sync_err("Failed to set target", e))?;

    let mut options = repo
        .checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)
        .map_err(|e| sync_err("Checkout failed", e))?;
    options.overwrite_existing = true;
    options.destination_is_initially_empty = false;

    let objects = repo
        .objects
        .clone()
        .into_arc()
        .map_err(|e| sync_err("Checkout failed", e))?;
    gix::worktree::state::checkout(
        &mut index,
        workdir.clone(),
        objects,
        &Discard,
        &Discard,
        &IS_INTERRUPTED,
        options,
    )
    .map_err(|e| sync_err("Checkout failed", e))?;
    index
        .write(Default::default())
        .map_err(|e| sync_err("Failed to write index", e))?;

    for path in &retired {
        remove_retired(path, &workdir)?;
    }

    info!(
        "Fast-forwarded {} to {} ({} files removed)",
        workdir.display(),
        target,
        retired.len()
    );
    Ok(())
}

fn index_at(repo: &gix::Repository, commit: gix::ObjectId) -> Result<gix::index::File> {
    let tree = repo
        .find_commit(commit)
        .map_err(|e| sync_err("Failed to get commit", e))?
        .tree_id()
        .map_err(|e| sync_err("Failed to get tree", e))?;
    repo.index_from_tree(&tree)
        .map_err(|e| sync_err("Failed to build index", e))
}

/// Deletes a file dropped upstream, then any directories it leaves empty.
fn remove_retired(path: &Path, workdir: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AggregatorError::file(path, e)),
    }

    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == workdir || std::fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}
