//! Read-only projection of a [`ChangeSet`] for presentation surfaces.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PresenterError;
use crate::status::FileStatus;
use crate::vcs::{ChangeSet, FileChange, Partition};

/// Opaque identifier for one projected file: `<partition>:<path>`.
///
/// Decoding never consults a snapshot, so an id stays usable across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    partition: Partition,
    path: PathBuf,
}

impl FileId {
    pub fn new(partition: Partition, path: impl Into<PathBuf>) -> Self {
        Self {
            partition,
            path: path.into(),
        }
    }

    pub fn parse(id: &str) -> Result<Self, PresenterError> {
        let unknown = || PresenterError::UnknownFile(id.to_string());

        let (prefix, path) = id.split_once(':').ok_or_else(unknown)?;
        let partition = match prefix {
            "staged" => Partition::Staged,
            "unstaged" => Partition::Unstaged,
            _ => return Err(unknown()),
        };
        if path.is_empty() {
            return Err(unknown());
        }

        Ok(Self::new(partition, path))
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition.as_str(), self.path.display())
    }
}

/// One renderable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub id: String,
    /// File name without directories.
    pub name: String,
    /// Parent directory relative to the workspace root, `.` at the root.
    pub path: String,
    pub status: FileStatus,
    pub glyph: char,
}

/// Grouped rows ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub staged: Vec<FileEntry>,
    pub unstaged: Vec<FileEntry>,
}

impl Projection {
    /// Project a snapshot. Paths under one of `roots` are shown relative to
    /// the deepest such root.
    pub fn build(set: &ChangeSet, roots: &[PathBuf]) -> Self {
        let entries = |files: &[FileChange], partition: Partition| -> Vec<FileEntry> {
            files
                .iter()
                .map(|file| entry(file, partition, roots))
                .collect()
        };

        Self {
            staged: entries(set.staged(), Partition::Staged),
            unstaged: entries(set.unstaged(), Partition::Unstaged),
        }
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn unstaged_count(&self) -> usize {
        self.unstaged.len()
    }

    pub fn total(&self) -> usize {
        self.staged_count() + self.unstaged_count()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

fn entry(file: &FileChange, partition: Partition, roots: &[PathBuf]) -> FileEntry {
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.path.display().to_string());

    FileEntry {
        id: FileId::new(partition, &file.path).to_string(),
        name,
        path: parent_display(&file.path, roots),
        status: file.status,
        glyph: file.status.glyph(),
    }
}

fn parent_display(path: &Path, roots: &[PathBuf]) -> String {
    let relative = roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);

    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().replace('\\', "/")
        }
        _ => ".".to_string(),
    }
}
