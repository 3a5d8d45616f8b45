//! git2-backed [`VcsGateway`] spanning one or more repository roots.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::build::CheckoutBuilder;
use git2::{
    Commit, ErrorCode, IndexAddOption, IndexEntry, IndexTime, Oid, Repository, ResetType,
    Status, StatusEntry, StatusOptions, TreeEntry,
};
use tracing::{debug, info, warn};

use crate::error::VcsError;
use crate::status::{FileStatus, code, map_status};

use super::diff::repository_diff;
use super::{ChangeCallback, CommitReport, FileChange, Observers, Partition, VcsGateway};

/// Index-side status bits.
const INDEX_BITS: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// Working-tree-side status bits.
const WORKTREE_BITS: Status = Status::WT_NEW
    .union(Status::WT_MODIFIED)
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::WT_RENAMED)
    .union(Status::CONFLICTED);

/// Working-tree status bits that can be restored from the index.
const RESTORABLE_BITS: Status = Status::WT_MODIFIED
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::CONFLICTED);

const EXECUTABLE_MODE: u32 = 0o100755;
const SYMLINK_MODE: u32 = 0o120000;

/// Gateway over the git repositories found at the configured paths.
pub struct GitGateway {
    roots: Vec<PathBuf>,
    observers: Observers,
}

impl GitGateway {
    /// Discover the repository containing each path.
    ///
    /// Paths outside any repository are skipped with a warning; duplicates
    /// resolving to the same working directory collapse into one root.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match discover_root(path) {
                Ok(root) => {
                    if !roots.contains(&root) {
                        debug!("Tracking repository {}", root.display());
                        roots.push(root);
                    }
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Self {
            roots,
            observers: Observers::new(),
        }
    }

    /// Working directories of every tracked repository.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Handle to the observer list, shared with the watcher task.
    pub fn observers(&self) -> Observers {
        self.observers.clone()
    }

    /// Hash of HEAD, the index entries and every status entry across all
    /// roots. Changed working-tree files also contribute their size and
    /// modification time, so editing an already modified file moves it.
    ///
    /// Two equal fingerprints mean nothing visible to [`list_staged`] or
    /// [`list_unstaged`] changed in between.
    ///
    /// [`list_staged`]: VcsGateway::list_staged
    /// [`list_unstaged`]: VcsGateway::list_unstaged
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        for root in &self.roots {
            root.hash(&mut hasher);
            let Ok(repo) = Repository::open(root) else {
                continue;
            };

            if let Ok(head) = repo.head() {
                head.target().map(|oid| oid.as_bytes().to_vec()).hash(&mut hasher);
            }

            if let Ok(index) = repo.index() {
                for entry in index.iter() {
                    entry.path.hash(&mut hasher);
                    entry.id.as_bytes().hash(&mut hasher);
                }
            }

            if let Ok(statuses) = repo.statuses(Some(&mut status_options())) {
                for entry in statuses.iter() {
                    entry.path_bytes().hash(&mut hasher);
                    entry.status().bits().hash(&mut hasher);

                    if !entry.status().intersects(WORKTREE_BITS) {
                        continue;
                    }
                    let meta = entry
                        .path()
                        .and_then(|p| root.join(p).symlink_metadata().ok());
                    if let Some(meta) = meta {
                        meta.len().hash(&mut hasher);
                        meta.modified().ok().hash(&mut hasher);
                    }
                }
            }
        }

        hasher.finish()
    }

    fn open_root(&self, root: &Path) -> Result<Repository, VcsError> {
        Repository::open(root).map_err(|source| VcsError::OpenRepository {
            path: root.to_path_buf(),
            source,
        })
    }

    /// Find the repository owning `path` and the path relative to its root.
    fn locate(&self, path: &Path) -> Result<(Repository, PathBuf, PathBuf), VcsError> {
        let absolute = if path.is_relative() {
            match self.roots.first() {
                Some(first) => first.join(path),
                None => return Err(VcsError::NoRepository(path.to_path_buf())),
            }
        } else {
            path.to_path_buf()
        };

        let candidates = [absolute.clone(), normalize(&absolute)];
        for candidate in &candidates {
            let owner = self
                .roots
                .iter()
                .filter(|root| candidate.starts_with(root))
                .max_by_key(|root| root.components().count());

            if let Some(root) = owner {
                let rel = candidate
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                if rel.as_os_str().is_empty() {
                    break;
                }
                let repo = self.open_root(root)?;
                return Ok((repo, root.clone(), rel));
            }
        }

        Err(VcsError::NoRepository(path.to_path_buf()))
    }

    fn collect(&self, partition: Partition) -> Vec<FileChange> {
        let mut files = Vec::new();

        for root in &self.roots {
            let repo = match self.open_root(root) {
                Ok(repo) => repo,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            let statuses = match repo.statuses(Some(&mut status_options())) {
                Ok(statuses) => statuses,
                Err(e) => {
                    warn!("Failed to read status of {}: {}", root.display(), e);
                    continue;
                }
            };

            for entry in statuses.iter() {
                if let Some(change) = file_change(root, &entry, partition) {
                    files.push(change);
                }
            }
        }

        files
    }

    /// Run `op` against every root, continuing past failures.
    ///
    /// Returns the first error once every root has been processed.
    fn for_each_root<F>(&self, operation: &str, mut op: F) -> Result<(), VcsError>
    where
        F: FnMut(&Repository, &Path) -> Result<(), VcsError>,
    {
        let mut first_error = None;

        for root in &self.roots {
            let result = self
                .open_root(root)
                .and_then(|repo| op(&repo, root));

            if let Err(e) = result {
                warn!("{} failed in {}: {}", operation, root.display(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VcsGateway for GitGateway {
    async fn list_staged(&self) -> Vec<FileChange> {
        self.collect(Partition::Staged)
    }

    async fn list_unstaged(&self) -> Vec<FileChange> {
        self.collect(Partition::Unstaged)
    }

    async fn diff(&self, staged: bool) -> String {
        let multiple = self.roots.len() > 1;
        let mut combined = String::new();

        for root in &self.roots {
            let text = match self.open_root(root) {
                Ok(repo) => repository_diff(&repo, staged),
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };

            match text {
                Ok(text) if text.is_empty() => {}
                Ok(text) if multiple => {
                    combined.push_str(&format!(
                        "--- Repository: {} ---\n{}\n\n",
                        root.display(),
                        text
                    ));
                }
                Ok(text) => combined.push_str(&text),
                Err(e) => warn!("Failed to collect diff for {}: {}", root.display(), e),
            }
        }

        debug!("Collected {} bytes of {} diff", combined.len(), partition_name(staged));
        combined
    }

    async fn stage(&self, path: &Path) -> Result<(), VcsError> {
        let (repo, root, rel) = self.locate(path)?;
        debug!("Staging {}", rel.display());
        stage_path(&repo, &root, &rel)?;
        self.observers.notify();
        Ok(())
    }

    async fn unstage(&self, path: &Path) -> Result<(), VcsError> {
        let (repo, _, rel) = self.locate(path)?;
        debug!("Unstaging {}", rel.display());
        unstage_path(&repo, &rel)?;
        self.observers.notify();
        Ok(())
    }

    async fn discard(&self, path: &Path) -> Result<(), VcsError> {
        let (repo, root, rel) = self.locate(path)?;
        debug!("Discarding {}", rel.display());
        discard_path(&repo, &root, &rel)?;
        self.observers.notify();
        Ok(())
    }

    async fn stage_all(&self) -> Result<(), VcsError> {
        let result = self.for_each_root("stage all", |repo, _| {
            let mut index = repo.index().map_err(VcsError::Index)?;
            index
                .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
                .map_err(VcsError::Index)?;
            index
                .update_all(["*"].iter(), None)
                .map_err(VcsError::Index)?;
            index.write().map_err(VcsError::Index)
        });
        self.observers.notify();
        result
    }

    async fn unstage_all(&self) -> Result<(), VcsError> {
        let result = self.for_each_root("unstage all", |repo, _| match head_commit(repo)? {
            Some(commit) => repo
                .reset(commit.as_object(), ResetType::Mixed, None)
                .map_err(VcsError::Index),
            None => {
                let mut index = repo.index().map_err(VcsError::Index)?;
                index.clear().map_err(VcsError::Index)?;
                index.write().map_err(VcsError::Index)
            }
        });
        self.observers.notify();
        result
    }

    async fn discard_all(&self) -> Result<(), VcsError> {
        let result = self.for_each_root("discard all", |repo, root| {
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            repo.checkout_index(None, Some(&mut checkout))
                .map_err(VcsError::Checkout)?;

            let untracked: Vec<PathBuf> = repo
                .statuses(Some(&mut status_options()))
                .map_err(VcsError::Status)?
                .iter()
                .filter(|entry| entry.status().is_wt_new())
                .filter_map(|entry| entry.path().map(|p| root.join(p)))
                .collect();

            for path in untracked {
                remove_from_disk(&path)?;
            }
            Ok(())
        });
        self.observers.notify();
        result
    }

    async fn commit(&self, message: &str) -> Result<CommitReport, VcsError> {
        if message.trim().is_empty() {
            return Err(VcsError::EmptyMessage);
        }

        let mut report = CommitReport::default();
        let mut any_staged = false;

        for root in &self.roots {
            let repo = match self.open_root(root) {
                Ok(repo) => repo,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };

            match has_staged_changes(&repo) {
                Ok(false) => continue,
                Ok(true) => any_staged = true,
                Err(e) => {
                    warn!("Skipping commit in {}: {}", root.display(), e);
                    continue;
                }
            }

            match commit_index(&repo, message) {
                Ok(oid) => {
                    info!("Committed {} in {}", oid, root.display());
                    report.committed.push(root.clone());
                }
                Err(e) => {
                    warn!("Commit failed in {}: {}", root.display(), e);
                    report.failed.push((root.clone(), e.to_string()));
                }
            }
        }

        if !any_staged {
            return Err(VcsError::NoStagedChanges);
        }

        if report.committed.is_empty() {
            return Err(VcsError::CommitFailed {
                failures: report
                    .failed
                    .iter()
                    .map(|(root, reason)| format!("{}: {}", root.display(), reason))
                    .collect(),
            });
        }

        self.observers.notify();
        Ok(report)
    }

    fn on_change(&self, callback: ChangeCallback) {
        self.observers.register(callback);
    }
}

fn partition_name(staged: bool) -> &'static str {
    if staged { "staged" } else { "unstaged" }
}

fn status_options() -> StatusOptions {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);
    opts
}

fn discover_root(path: &Path) -> Result<PathBuf, VcsError> {
    let repo = Repository::discover(path).map_err(|source| match source.code() {
        ErrorCode::NotFound => VcsError::NoRepository(path.to_path_buf()),
        _ => VcsError::OpenRepository {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| VcsError::NoRepository(path.to_path_buf()))?;

    Ok(normalize(workdir))
}

/// Canonicalize a path, falling back to its parent for files that no longer
/// exist on disk.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Translate the git2 bits for one side of the index into a raw status code.
fn raw_code(status: Status, partition: Partition) -> Option<u32> {
    match partition {
        Partition::Staged => {
            if status.is_index_new() {
                Some(code::INDEX_ADDED)
            } else if status.is_index_modified() {
                Some(code::INDEX_MODIFIED)
            } else if status.is_index_deleted() {
                Some(code::INDEX_DELETED)
            } else if status.is_index_renamed() {
                Some(code::INDEX_RENAMED)
            } else if status.is_index_typechange() {
                Some(code::TYPE_CHANGED)
            } else {
                None
            }
        }
        Partition::Unstaged => {
            if status.is_conflicted() {
                Some(code::BOTH_MODIFIED)
            } else if status.is_wt_new() {
                Some(code::UNTRACKED)
            } else if status.is_wt_modified() {
                Some(code::MODIFIED)
            } else if status.is_wt_deleted() {
                Some(code::DELETED)
            } else if status.is_wt_renamed() {
                Some(code::INTENT_TO_RENAME)
            } else if status.is_wt_typechange() {
                Some(code::TYPE_CHANGED)
            } else if status.is_ignored() {
                Some(code::IGNORED)
            } else {
                None
            }
        }
    }
}

fn file_change(root: &Path, entry: &StatusEntry<'_>, partition: Partition) -> Option<FileChange> {
    let raw = raw_code(entry.status(), partition)?;
    let status = map_status(raw);

    let delta = match partition {
        Partition::Staged => entry.head_to_index(),
        Partition::Unstaged => entry.index_to_workdir(),
    };
    let new_path = delta
        .as_ref()
        .and_then(|d| d.new_file().path())
        .map(Path::to_path_buf)
        .or_else(|| entry.path().map(PathBuf::from))?;
    let old_path = delta
        .as_ref()
        .and_then(|d| d.old_file().path())
        .map(Path::to_path_buf);

    match old_path {
        Some(old) if status == FileStatus::Renamed && old != new_path => {
            Some(FileChange::renamed(root.join(new_path), root.join(old)))
        }
        _ => Some(FileChange::new(root.join(new_path), status)),
    }
}

fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, VcsError> {
    match repo.head() {
        Ok(head) => head.peel_to_commit().map(Some).map_err(VcsError::Status),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            Ok(None)
        }
        Err(e) => Err(VcsError::Status(e)),
    }
}

fn has_staged_changes(repo: &Repository) -> Result<bool, VcsError> {
    let statuses = repo
        .statuses(Some(&mut status_options()))
        .map_err(VcsError::Status)?;
    Ok(statuses
        .iter()
        .any(|entry| entry.status().intersects(INDEX_BITS)))
}

/// Status paths equal to `rel` or inside it, for entries with any of `bits`.
///
/// Matching is by path component, never by pattern, so a name holding `*`,
/// `?` or `[` selects only itself. A rename contributes both of its paths.
fn changed_paths(repo: &Repository, rel: &Path, bits: Status) -> Result<Vec<PathBuf>, VcsError> {
    let statuses = repo
        .statuses(Some(&mut status_options()))
        .map_err(VcsError::Status)?;
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in statuses.iter().filter(|e| e.status().intersects(bits)) {
        let mut candidates: Vec<PathBuf> = Vec::new();
        for delta in [entry.head_to_index(), entry.index_to_workdir()].into_iter().flatten() {
            candidates.extend(delta.old_file().path().map(Path::to_path_buf));
            candidates.extend(delta.new_file().path().map(Path::to_path_buf));
        }
        candidates.extend(entry.path().map(PathBuf::from));

        if candidates.iter().any(|path| path.starts_with(rel)) {
            for path in candidates {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
    }

    Ok(paths)
}

fn stage_path(repo: &Repository, root: &Path, rel: &Path) -> Result<(), VcsError> {
    let mut targets = changed_paths(repo, rel, WORKTREE_BITS)?;
    if targets.is_empty() {
        targets.push(rel.to_path_buf());
    }

    let mut index = repo.index().map_err(VcsError::Index)?;
    for target in &targets {
        if root.join(target).symlink_metadata().is_ok() {
            index.add_path(target).map_err(VcsError::Index)?;
        } else {
            index.remove_path(target).map_err(VcsError::Index)?;
        }
    }

    index.write().map_err(VcsError::Index)
}

/// Put the HEAD version of every staged path under `rel` back into the
/// index, or drop the entry when HEAD has none.
fn unstage_path(repo: &Repository, rel: &Path) -> Result<(), VcsError> {
    let targets = changed_paths(repo, rel, INDEX_BITS)?;
    if targets.is_empty() {
        debug!("{} has no staged changes", rel.display());
        return Ok(());
    }

    let tree = head_commit(repo)?
        .map(|commit| commit.tree())
        .transpose()
        .map_err(VcsError::Index)?;

    let mut index = repo.index().map_err(VcsError::Index)?;
    for target in &targets {
        match tree.as_ref().and_then(|t| t.get_path(target).ok()) {
            Some(entry) => index
                .add(&head_entry(target, &entry))
                .map_err(VcsError::Index)?,
            None => index.remove_path(target).map_err(VcsError::Index)?,
        }
    }

    index.write().map_err(VcsError::Index)
}

/// Index entry for a HEAD blob. Zeroed stat data makes git rehash the
/// working file on the next status read.
fn head_entry(path: &Path, entry: &TreeEntry<'_>) -> IndexEntry {
    let path = path.to_string_lossy().replace('\\', "/").into_bytes();
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: entry.filemode() as u32,
        uid: 0,
        gid: 0,
        file_size: 0,
        id: entry.id(),
        flags: path.len().min(0xfff) as u16,
        flags_extended: 0,
        path,
    }
}

fn discard_path(repo: &Repository, root: &Path, rel: &Path) -> Result<(), VcsError> {
    let absolute = root.join(rel);

    match repo.status_file(rel) {
        Ok(status) if status.is_wt_new() => remove_from_disk(&absolute),
        Ok(status) if status.intersects(RESTORABLE_BITS) => restore_from_index(repo, root, rel),
        Ok(_) => {
            debug!("{} has no working-tree changes", rel.display());
            Ok(())
        }
        Err(e) => {
            // Status unknown: restore tracked content, then delete whatever
            // is left untracked.
            warn!("Could not read status of {}: {}", rel.display(), e);
            if let Err(e) = restore_from_index(repo, root, rel) {
                warn!("Restore of {} failed: {}", rel.display(), e);
            }

            let tracked = repo
                .index()
                .map(|index| index.get_path(rel, 0).is_some())
                .unwrap_or(false);
            if !tracked && absolute.symlink_metadata().is_ok() {
                if let Err(e) = remove_from_disk(&absolute) {
                    warn!("Delete of {} failed: {}", rel.display(), e);
                }
            }
            Ok(())
        }
    }
}

/// Write the index version of exactly `rel` back to the working tree.
///
/// A conflicted path has no stage-0 entry and is restored from "ours".
fn restore_from_index(repo: &Repository, root: &Path, rel: &Path) -> Result<(), VcsError> {
    let index = repo.index().map_err(VcsError::Index)?;
    let Some(entry) = index.get_path(rel, 0).or_else(|| index.get_path(rel, 2)) else {
        debug!("{} is not in the index", rel.display());
        return Ok(());
    };

    let blob = repo.find_blob(entry.id).map_err(VcsError::Checkout)?;
    write_worktree_file(&root.join(rel), entry.mode, blob.content())
}

fn write_worktree_file(path: &Path, mode: u32, content: &[u8]) -> Result<(), VcsError> {
    let io_error = |source| VcsError::Io {
        path: path.to_path_buf(),
        source,
    };

    match path.symlink_metadata() {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path).map_err(io_error)?,
        Ok(meta) if meta.file_type().is_symlink() => std::fs::remove_file(path).map_err(io_error)?,
        _ => {}
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    if mode == SYMLINK_MODE {
        return write_symlink(path, content).map_err(io_error);
    }

    std::fs::write(path, content).map_err(io_error)?;
    set_executable(path, mode == EXECUTABLE_MODE).map_err(io_error)
}

#[cfg(unix)]
fn write_symlink(path: &Path, target: &[u8]) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(std::ffi::OsStr::from_bytes(target), path)
}

/// Without symlink support git writes the link target as a plain file.
#[cfg(not(unix))]
fn write_symlink(path: &Path, target: &[u8]) -> io::Result<()> {
    std::fs::write(path, target)
}

#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = if executable { 0o755 } else { 0o644 };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> io::Result<()> {
    Ok(())
}

fn remove_from_disk(path: &Path) -> Result<(), VcsError> {
    let is_dir = path
        .symlink_metadata()
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    let result = if is_dir {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(VcsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn commit_index(repo: &Repository, message: &str) -> Result<Oid, VcsError> {
    let mut index = repo.index().map_err(VcsError::Index)?;
    let tree_id = index.write_tree().map_err(VcsError::Index)?;
    let tree = repo.find_tree(tree_id).map_err(VcsError::Commit)?;
    let sig = repo.signature().map_err(VcsError::Signature)?;

    let parent = head_commit(repo)?;
    let parents: Vec<&Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(VcsError::Commit)
}
