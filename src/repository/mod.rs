// file: src/repository/mod.rs
// description: Repository operations module exports
// reference: Internal module structure

pub mod fleet;
pub mod naming;
pub mod sync;

pub use fleet::{FleetReport, FleetUpdater};
pub use naming::{local_repo_name, owner_and_name};
pub use sync::{GitBackend, GixBackend, RepoState, RepositorySync, SyncMode, SyncOutcome, SyncResult};
