//! Integration tests for the git2-backed gateway against scratch repositories.

mod common;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use commitcraft::vcs::{FileChange, GitGateway, VcsGateway};
use commitcraft::{FileStatus, VcsError};
use common::TestRepo;

fn status_of(files: &[FileChange], path: &PathBuf) -> Option<FileStatus> {
    files.iter().find(|f| &f.path == path).map(|f| f.status)
}

fn assert_unique_paths(files: &[FileChange]) {
    let mut seen = HashSet::new();
    for file in files {
        assert!(seen.insert(&file.path), "duplicate path {:?}", file.path);
    }
}

#[tokio::test]
async fn test_lists_staged_and_unstaged() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "hello\nworld\n");
    repo.write("new.txt", "new\n");
    repo.write("staged.txt", "staged\n");
    repo.stage("staged.txt");

    let gateway = GitGateway::open(&[repo.root()]);
    let staged = gateway.list_staged().await;
    let unstaged = gateway.list_unstaged().await;

    assert_eq!(status_of(&staged, &repo.path("staged.txt")), Some(FileStatus::Added));
    assert_eq!(status_of(&unstaged, &repo.path("README.md")), Some(FileStatus::Modified));
    assert_eq!(status_of(&unstaged, &repo.path("new.txt")), Some(FileStatus::Untracked));
    assert_eq!(staged.len(), 1);
    assert_unique_paths(&staged);
    assert_unique_paths(&unstaged);
}

#[tokio::test]
async fn test_partially_staged_file_appears_in_both() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "hello\nstaged line\n");
    repo.stage("README.md");
    repo.write("README.md", "hello\nstaged line\nunstaged line\n");

    let gateway = GitGateway::open(&[repo.root()]);
    let readme = repo.path("README.md");

    assert_eq!(status_of(&gateway.list_staged().await, &readme), Some(FileStatus::Modified));
    assert_eq!(status_of(&gateway.list_unstaged().await, &readme), Some(FileStatus::Modified));
}

#[tokio::test]
async fn test_stage_then_unstage_restores_classification() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "changed\n");
    repo.write("fresh.txt", "fresh\n");

    let gateway = GitGateway::open(&[repo.root()]);
    let before = gateway.list_unstaged().await;

    for rel in ["README.md", "fresh.txt"] {
        gateway.stage(&repo.path(rel)).await.unwrap();
    }
    assert_eq!(gateway.list_staged().await.len(), 2);
    assert_eq!(
        status_of(&gateway.list_staged().await, &repo.path("fresh.txt")),
        Some(FileStatus::Added)
    );

    for rel in ["README.md", "fresh.txt"] {
        gateway.unstage(&repo.path(rel)).await.unwrap();
    }

    assert!(gateway.list_staged().await.is_empty());
    assert_eq!(gateway.list_unstaged().await, before);
}

#[tokio::test]
async fn test_mutations_are_idempotent() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "changed\n");
    let gateway = GitGateway::open(&[repo.root()]);
    let readme = repo.path("README.md");

    gateway.stage(&readme).await.unwrap();
    gateway.stage(&readme).await.unwrap();
    assert_eq!(gateway.list_staged().await.len(), 1);

    gateway.unstage(&readme).await.unwrap();
    gateway.unstage(&readme).await.unwrap();
    assert!(gateway.list_staged().await.is_empty());

    gateway.discard(&readme).await.unwrap();
    gateway.discard(&readme).await.unwrap();
    assert!(gateway.list_unstaged().await.is_empty());
    assert_eq!(repo.read("README.md").as_deref(), Some("hello\n"));
}

#[tokio::test]
async fn test_stage_on_unborn_branch() {
    let repo = TestRepo::new();
    repo.write("first.txt", "1\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.stage(&repo.path("first.txt")).await.unwrap();
    assert_eq!(gateway.list_staged().await.len(), 1);

    gateway.unstage(&repo.path("first.txt")).await.unwrap();
    assert!(gateway.list_staged().await.is_empty());
    assert_eq!(
        status_of(&gateway.list_unstaged().await, &repo.path("first.txt")),
        Some(FileStatus::Untracked)
    );
}

#[tokio::test]
async fn test_relative_paths_resolve_against_first_root() {
    let repo = TestRepo::with_initial_commit();
    repo.write("src/lib.rs", "pub fn x() {}\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.stage(std::path::Path::new("src/lib.rs")).await.unwrap();
    assert_eq!(
        status_of(&gateway.list_staged().await, &repo.path("src/lib.rs")),
        Some(FileStatus::Added)
    );
}

#[tokio::test]
async fn test_stage_deleted_file() {
    let repo = TestRepo::with_initial_commit();
    std::fs::remove_file(repo.path("README.md")).unwrap();
    let gateway = GitGateway::open(&[repo.root()]);

    assert_eq!(
        status_of(&gateway.list_unstaged().await, &repo.path("README.md")),
        Some(FileStatus::Deleted)
    );

    gateway.stage(&repo.path("README.md")).await.unwrap();
    assert_eq!(
        status_of(&gateway.list_staged().await, &repo.path("README.md")),
        Some(FileStatus::Deleted)
    );
}

#[tokio::test]
async fn test_discard_tracked_reverts_content() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "scribbles\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.discard(&repo.path("README.md")).await.unwrap();

    assert_eq!(repo.read("README.md").as_deref(), Some("hello\n"));
    assert!(gateway.list_unstaged().await.is_empty());
}

#[tokio::test]
async fn test_discard_untracked_deletes_file() {
    let repo = TestRepo::with_initial_commit();
    repo.write("scratch.txt", "tmp\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.discard(&repo.path("scratch.txt")).await.unwrap();

    assert!(repo.read("scratch.txt").is_none());
    assert!(gateway.list_unstaged().await.is_empty());
}

#[tokio::test]
async fn test_discard_glob_named_file_leaves_siblings_alone() {
    let repo = TestRepo::with_initial_commit();
    for name in ["a.txt", "b.txt", "[ab].txt"] {
        repo.write(name, "orig\n");
        repo.stage(name);
    }
    repo.commit("add files");
    for name in ["a.txt", "b.txt", "[ab].txt"] {
        repo.write(name, "edit\n");
    }
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.discard(&repo.path("[ab].txt")).await.unwrap();

    assert_eq!(repo.read("[ab].txt").as_deref(), Some("orig\n"));
    assert_eq!(repo.read("a.txt").as_deref(), Some("edit\n"));
    assert_eq!(repo.read("b.txt").as_deref(), Some("edit\n"));
    assert_eq!(gateway.list_unstaged().await.len(), 2);
}

#[tokio::test]
async fn test_stage_and_unstage_glob_named_file_are_literal() {
    let repo = TestRepo::with_initial_commit();
    for name in ["a.txt", "[ab].txt", "*.txt"] {
        repo.write(name, "orig\n");
        repo.stage(name);
    }
    repo.commit("add files");
    for name in ["a.txt", "[ab].txt", "*.txt"] {
        repo.write(name, "edit\n");
    }
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.stage(&repo.path("[ab].txt")).await.unwrap();
    let staged = gateway.list_staged().await;
    assert_eq!(staged.len(), 1);
    assert_eq!(status_of(&staged, &repo.path("[ab].txt")), Some(FileStatus::Modified));

    gateway.stage(&repo.path("a.txt")).await.unwrap();
    gateway.stage(&repo.path("*.txt")).await.unwrap();
    gateway.unstage(&repo.path("*.txt")).await.unwrap();

    let staged = gateway.list_staged().await;
    assert_eq!(staged.len(), 2);
    assert!(status_of(&staged, &repo.path("*.txt")).is_none());
    assert_eq!(status_of(&staged, &repo.path("a.txt")), Some(FileStatus::Modified));
}

#[tokio::test]
async fn test_moved_file_lists_both_sides_and_discards_one_at_a_time() {
    let repo = TestRepo::with_initial_commit();
    std::fs::rename(repo.path("README.md"), repo.path("MOVED.md")).unwrap();
    let gateway = GitGateway::open(&[repo.root()]);

    let unstaged = gateway.list_unstaged().await;
    assert_eq!(unstaged.len(), 2);
    assert_eq!(status_of(&unstaged, &repo.path("README.md")), Some(FileStatus::Deleted));
    assert_eq!(status_of(&unstaged, &repo.path("MOVED.md")), Some(FileStatus::Untracked));

    gateway.discard(&repo.path("MOVED.md")).await.unwrap();

    assert!(repo.read("MOVED.md").is_none());
    let unstaged = gateway.list_unstaged().await;
    assert_eq!(unstaged.len(), 1);
    assert_eq!(status_of(&unstaged, &repo.path("README.md")), Some(FileStatus::Deleted));

    gateway.discard(&repo.path("README.md")).await.unwrap();

    assert_eq!(repo.read("README.md").as_deref(), Some("hello\n"));
    assert!(gateway.list_unstaged().await.is_empty());
}

#[tokio::test]
async fn test_unstage_staged_rename_restores_both_paths() {
    let repo = TestRepo::with_initial_commit();
    std::fs::rename(repo.path("README.md"), repo.path("MOVED.md")).unwrap();
    let gateway = GitGateway::open(&[repo.root()]);
    gateway.stage(&repo.path("README.md")).await.unwrap();
    gateway.stage(&repo.path("MOVED.md")).await.unwrap();

    let staged = gateway.list_staged().await;
    assert_eq!(staged.len(), 1);
    assert_eq!(status_of(&staged, &repo.path("MOVED.md")), Some(FileStatus::Renamed));

    gateway.unstage(&repo.path("MOVED.md")).await.unwrap();

    assert!(gateway.list_staged().await.is_empty());
    let unstaged = gateway.list_unstaged().await;
    assert_eq!(status_of(&unstaged, &repo.path("README.md")), Some(FileStatus::Deleted));
    assert_eq!(status_of(&unstaged, &repo.path("MOVED.md")), Some(FileStatus::Untracked));
}

#[tokio::test]
async fn test_stage_and_unstage_directory() {
    let repo = TestRepo::with_initial_commit();
    repo.write("dir/one.txt", "1\n");
    repo.write("dir/nested/two.txt", "2\n");
    repo.write("outside.txt", "x\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.stage(&repo.path("dir")).await.unwrap();
    let staged = gateway.list_staged().await;
    assert_eq!(staged.len(), 2);
    assert!(status_of(&staged, &repo.path("outside.txt")).is_none());

    gateway.unstage(&repo.path("dir")).await.unwrap();
    assert!(gateway.list_staged().await.is_empty());
    assert_eq!(gateway.list_unstaged().await.len(), 3);
}

#[tokio::test]
async fn test_discard_all_keeps_staged_changes() {
    let repo = TestRepo::with_initial_commit();
    repo.write("keep.txt", "keep\n");
    repo.stage("keep.txt");
    repo.write("README.md", "scribbles\n");
    repo.write("junk.txt", "junk\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.discard_all().await.unwrap();

    assert!(gateway.list_unstaged().await.is_empty());
    assert_eq!(gateway.list_staged().await.len(), 1);
    assert_eq!(repo.read("keep.txt").as_deref(), Some("keep\n"));
    assert!(repo.read("junk.txt").is_none());
}

#[tokio::test]
async fn test_stage_all_and_unstage_all() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "changed\n");
    repo.write("a.txt", "a\n");
    repo.write("dir/b.txt", "b\n");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.stage_all().await.unwrap();
    assert_eq!(gateway.list_staged().await.len(), 3);
    assert!(gateway.list_unstaged().await.is_empty());

    gateway.unstage_all().await.unwrap();
    assert!(gateway.list_staged().await.is_empty());
    assert_eq!(gateway.list_unstaged().await.len(), 3);
}

#[tokio::test]
async fn test_commit_rejects_blank_message_without_side_effect() {
    let repo = TestRepo::with_initial_commit();
    repo.write("a.txt", "a\n");
    repo.stage("a.txt");
    let gateway = GitGateway::open(&[repo.root()]);

    for message in ["", "   ", "\n\t"] {
        assert!(matches!(
            gateway.commit(message).await,
            Err(VcsError::EmptyMessage)
        ));
    }
    assert_eq!(repo.commit_count(), 1);
    assert_eq!(gateway.list_staged().await.len(), 1);
}

#[tokio::test]
async fn test_commit_without_staged_changes() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "unstaged only\n");
    let gateway = GitGateway::open(&[repo.root()]);

    assert!(matches!(
        gateway.commit("feat: nothing").await,
        Err(VcsError::NoStagedChanges)
    ));
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_commit_creates_commit() {
    let repo = TestRepo::with_initial_commit();
    repo.write("a.txt", "a\n");
    repo.stage("a.txt");
    let gateway = GitGateway::open(&[repo.root()]);

    let report = gateway.commit("feat: add a").await.unwrap();

    assert_eq!(report.committed, vec![repo.root()]);
    assert!(report.failed.is_empty());
    assert_eq!(repo.commit_count(), 2);
    assert_eq!(repo.head_message().as_deref(), Some("feat: add a"));
    assert!(gateway.list_staged().await.is_empty());
}

#[tokio::test]
async fn test_first_commit_on_unborn_branch() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a\n");
    repo.stage("a.txt");
    let gateway = GitGateway::open(&[repo.root()]);

    gateway.commit("chore: start").await.unwrap();
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_commit_only_in_repositories_with_staged_changes() {
    let a = TestRepo::with_initial_commit();
    let b = TestRepo::with_initial_commit();
    a.write("a.txt", "a\n");
    a.stage("a.txt");
    b.write("README.md", "unstaged in b\n");

    let gateway = GitGateway::open(&[a.root(), b.root()]);
    let report = gateway.commit("feat: only a").await.unwrap();

    assert_eq!(report.committed, vec![a.root()]);
    assert_eq!(a.commit_count(), 2);
    assert_eq!(b.commit_count(), 1);
    assert_eq!(b.read("README.md").as_deref(), Some("unstaged in b\n"));
}

#[tokio::test]
async fn test_lists_merge_every_root() {
    let a = TestRepo::with_initial_commit();
    let b = TestRepo::with_initial_commit();
    a.write("a.txt", "a\n");
    b.write("b.txt", "b\n");

    let gateway = GitGateway::open(&[a.root(), b.root()]);
    let unstaged = gateway.list_unstaged().await;

    assert!(status_of(&unstaged, &a.path("a.txt")).is_some());
    assert!(status_of(&unstaged, &b.path("b.txt")).is_some());
}

#[tokio::test]
async fn test_staged_diff_single_root_has_no_header() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "hello\nworld\n");
    repo.stage("README.md");
    let gateway = GitGateway::open(&[repo.root()]);

    let diff = gateway.diff(true).await;
    assert!(diff.contains("+world"));
    assert!(!diff.contains("--- Repository:"));
    assert!(gateway.diff(false).await.trim().is_empty());
}

#[tokio::test]
async fn test_diff_headers_identify_each_root() {
    let a = TestRepo::with_initial_commit();
    let b = TestRepo::with_initial_commit();
    a.write("a.txt", "from a\n");
    a.stage("a.txt");
    b.write("b.txt", "from b\n");
    b.stage("b.txt");

    let gateway = GitGateway::open(&[a.root(), b.root()]);
    let diff = gateway.diff(true).await;

    assert!(diff.contains(&format!("--- Repository: {} ---", a.root().display())));
    assert!(diff.contains(&format!("--- Repository: {} ---", b.root().display())));
    assert!(diff.contains("+from a"));
    assert!(diff.contains("+from b"));
}

#[tokio::test]
async fn test_unstaged_diff_includes_untracked_content() {
    let repo = TestRepo::with_initial_commit();
    repo.write("notes.md", "remember this\n");
    let gateway = GitGateway::open(&[repo.root()]);

    assert!(gateway.diff(false).await.contains("+remember this"));
}

#[tokio::test]
async fn test_no_roots_is_a_valid_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = GitGateway::open(&[dir.path()]);

    assert!(gateway.roots().is_empty());
    assert!(gateway.list_staged().await.is_empty());
    assert!(gateway.list_unstaged().await.is_empty());
    assert!(gateway.diff(true).await.is_empty());
    assert!(matches!(
        gateway.commit("feat: x").await,
        Err(VcsError::NoStagedChanges)
    ));
}

#[tokio::test]
async fn test_path_outside_roots_is_rejected() {
    let repo = TestRepo::with_initial_commit();
    let outside = tempfile::tempdir().unwrap();
    let gateway = GitGateway::open(&[repo.root()]);

    let result = gateway.stage(&outside.path().join("x.txt")).await;
    assert!(matches!(result, Err(VcsError::NoRepository(_))));
}

#[tokio::test]
async fn test_every_observer_is_notified_on_mutation() {
    let repo = TestRepo::with_initial_commit();
    repo.write("a.txt", "a\n");
    let gateway = GitGateway::open(&[repo.root()]);

    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));
    for counter in [&first, &second] {
        let counter = Arc::clone(counter);
        gateway.on_change(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    }

    gateway.stage(&repo.path("a.txt")).await.unwrap();
    gateway.commit("feat: a").await.unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fingerprint_moves_when_modified_file_is_edited_again() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "one\n");
    let gateway = GitGateway::open(&[repo.root()]);
    let before = gateway.fingerprint();

    repo.write("README.md", "one\ntwo\n");

    assert_ne!(gateway.fingerprint(), before);
}

#[tokio::test]
async fn test_fingerprint_moves_when_staged_file_is_restaged() {
    let repo = TestRepo::with_initial_commit();
    repo.write("a.txt", "a\n");
    repo.stage("a.txt");
    let gateway = GitGateway::open(&[repo.root()]);
    let before = gateway.fingerprint();

    repo.write("a.txt", "a\nb\n");
    repo.stage("a.txt");

    assert_ne!(gateway.fingerprint(), before);
}

#[tokio::test]
async fn test_fingerprint_is_stable_without_changes() {
    let repo = TestRepo::with_initial_commit();
    repo.write("README.md", "edited\n");
    let gateway = GitGateway::open(&[repo.root()]);

    assert_eq!(gateway.fingerprint(), gateway.fingerprint());
}
