//! Classification of backend status codes into a closed set of file states.
//!
//! Backends report changes with their own numeric codes. The numbers below are
//! the ones used by the editor's built-in git integration; the git2 backend
//! translates its status bits into the same codes so there is a single table.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Raw status codes understood by [`map_status`].
pub mod code {
    pub const INDEX_MODIFIED: u32 = 0;
    pub const INDEX_ADDED: u32 = 1;
    pub const INDEX_DELETED: u32 = 2;
    pub const INDEX_RENAMED: u32 = 3;
    pub const INDEX_COPIED: u32 = 4;
    pub const MODIFIED: u32 = 5;
    pub const DELETED: u32 = 6;
    pub const UNTRACKED: u32 = 7;
    pub const IGNORED: u32 = 8;
    pub const INTENT_TO_ADD: u32 = 9;
    pub const INTENT_TO_RENAME: u32 = 10;
    pub const TYPE_CHANGED: u32 = 11;
    pub const BOTH_MODIFIED: u32 = 18;
}

/// State of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Ignored,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Modified => "modified",
            FileStatus::Added => "added",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
            FileStatus::Untracked => "untracked",
            FileStatus::Ignored => "ignored",
        }
    }

    /// Single-letter badge shown next to the file name.
    pub fn glyph(&self) -> char {
        match self {
            FileStatus::Modified => 'M',
            FileStatus::Added => 'A',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Untracked => 'U',
            FileStatus::Ignored => 'I',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw backend status code to a [`FileStatus`].
///
/// Total: any code missing from the table is reported as `Modified`, so a
/// file is never dropped from view because the backend grew a new state.
pub fn map_status(raw: u32) -> FileStatus {
    match raw {
        code::INDEX_MODIFIED | code::MODIFIED | code::TYPE_CHANGED => FileStatus::Modified,
        code::INDEX_ADDED | code::INTENT_TO_ADD => FileStatus::Added,
        code::INDEX_DELETED | code::DELETED => FileStatus::Deleted,
        code::INDEX_RENAMED | code::INTENT_TO_RENAME => FileStatus::Renamed,
        code::UNTRACKED => FileStatus::Untracked,
        code::IGNORED => FileStatus::Ignored,
        other => {
            warn!("Unmapped status code {other}, treating as modified");
            FileStatus::Modified
        }
    }
}
