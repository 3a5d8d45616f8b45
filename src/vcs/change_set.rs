//! Immutable snapshot of staged and unstaged changes.

use std::collections::HashSet;

use tracing::warn;

use super::{FileChange, VcsGateway};

/// Staged and unstaged files at one point in time.
///
/// Never mutated after construction; a refresh builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    staged: Vec<FileChange>,
    unstaged: Vec<FileChange>,
}

impl ChangeSet {
    /// Build a snapshot, keeping the first occurrence of any path repeated
    /// within a partition.
    pub fn new(staged: Vec<FileChange>, unstaged: Vec<FileChange>) -> Self {
        Self {
            staged: dedup_by_path(staged, "staged"),
            unstaged: dedup_by_path(unstaged, "unstaged"),
        }
    }

    /// Read both partitions from the gateway as they are right now.
    pub async fn read(gateway: &dyn VcsGateway) -> Self {
        let staged = gateway.list_staged().await;
        let unstaged = gateway.list_unstaged().await;
        Self::new(staged, unstaged)
    }

    pub fn staged(&self) -> &[FileChange] {
        &self.staged
    }

    pub fn unstaged(&self) -> &[FileChange] {
        &self.unstaged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

fn dedup_by_path(files: Vec<FileChange>, partition: &str) -> Vec<FileChange> {
    let mut seen = HashSet::with_capacity(files.len());
    let mut result = Vec::with_capacity(files.len());

    for file in files {
        if seen.insert(file.path.clone()) {
            result.push(file);
        } else {
            warn!(
                "Dropping duplicate {} entry for {}",
                partition,
                file.path.display()
            );
        }
    }

    result
}
