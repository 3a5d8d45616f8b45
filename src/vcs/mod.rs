//! Version-control port and its git2-backed implementation.

pub mod change_set;
pub mod diff;
pub mod git;
pub mod observers;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::VcsError;
use crate::status::FileStatus;

pub use change_set::ChangeSet;
pub use git::GitGateway;
pub use observers::Observers;
pub use watcher::spawn_watcher;

/// Callback invoked when the backend state may have changed.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Which side of the index a change lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Staged,
    Unstaged,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Staged => "staged",
            Partition::Unstaged => "unstaged",
        }
    }
}

/// One file's deviation from the last commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Previous path, only set for renames.
    pub original_path: Option<PathBuf>,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            original_path: None,
        }
    }

    pub fn renamed(path: impl Into<PathBuf>, original_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Renamed,
            original_path: Some(original_path.into()),
        }
    }
}

/// Outcome of a multi-repository commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Roots where a commit was created.
    pub committed: Vec<PathBuf>,
    /// Roots that had staged changes but failed to commit, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Capabilities a version-control backend must provide.
///
/// Reads never fail: a missing repository is an empty result. Mutations are
/// idempotent, so repeating one against an already-reconciled file is a no-op.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsGateway: Send + Sync {
    /// Files with changes in the index.
    async fn list_staged(&self) -> Vec<FileChange>;

    /// Files with changes in the working tree (untracked included).
    async fn list_unstaged(&self) -> Vec<FileChange>;

    /// Unified diff text for one partition across every root.
    ///
    /// Empty when nothing could be retrieved.
    async fn diff(&self, staged: bool) -> String;

    async fn stage(&self, path: &Path) -> Result<(), VcsError>;

    async fn unstage(&self, path: &Path) -> Result<(), VcsError>;

    /// Throw away working-tree changes for `path`, deleting it if untracked.
    async fn discard(&self, path: &Path) -> Result<(), VcsError>;

    async fn stage_all(&self) -> Result<(), VcsError>;

    async fn unstage_all(&self) -> Result<(), VcsError>;

    async fn discard_all(&self) -> Result<(), VcsError>;

    /// Commit staged changes in every root that has some.
    async fn commit(&self, message: &str) -> Result<CommitReport, VcsError>;

    /// Register an observer. Every registration is kept.
    fn on_change(&self, callback: ChangeCallback);
}
