//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use commitcraft::presenter::{Notice, PresentationSurface, Projection};
use commitcraft::vcs::{ChangeCallback, CommitReport, FileChange, Observers, VcsGateway};
use commitcraft::{AiGateway, FileStatus, GenerationError, VcsError};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a committer identity.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    /// Create a repository with one committed file.
    pub fn with_initial_commit() -> Self {
        let repo = Self::new();
        repo.write("README.md", "hello\n");
        repo.stage("README.md");
        repo.commit("chore: initial commit");
        repo
    }

    /// Canonical working directory, as reported by the gateway.
    pub fn root(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp dir")
    }

    /// Absolute path of a file in the working tree.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn read(&self, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(rel)).ok()
    }

    /// Add a file to the index directly, bypassing the gateway.
    pub fn stage(&self, rel: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(rel)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Commit the current index. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com").expect("Failed to create signature");

        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let Ok(mut walk) = self.repo.revwalk() else {
            return 0;
        };
        if walk.push_head().is_err() {
            return 0;
        }
        walk.count()
    }

    pub fn head_message(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        commit.message().map(str::to_string)
    }
}

/// Mutable backend state behind [`FakeVcs`].
#[derive(Debug, Default, Clone)]
pub struct FakeState {
    pub staged: Vec<FileChange>,
    pub unstaged: Vec<FileChange>,
    pub diff: String,
    pub commits: Vec<String>,
}

/// In-memory version-control backend that behaves like a single repository.
#[derive(Default)]
pub struct FakeVcs {
    pub state: Mutex<FakeState>,
    pub observers: Observers,
    pub list_calls: AtomicU32,
}

impl FakeVcs {
    pub fn new(staged: Vec<FileChange>, unstaged: Vec<FileChange>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                staged,
                unstaged,
                ..FakeState::default()
            }),
            ..Self::default()
        }
    }

    pub fn with_diff(self, diff: &str) -> Self {
        self.state.lock().unwrap().diff = diff.to_string();
        self
    }

    /// Change state behind the presenter's back and notify, like an editor would.
    pub fn external_edit(&self, file: FileChange) {
        self.state.lock().unwrap().unstaged.push(file);
        self.observers.notify();
    }

    pub fn snapshot(&self) -> FakeState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl VcsGateway for FakeVcs {
    async fn list_staged(&self) -> Vec<FileChange> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().staged.clone()
    }

    async fn list_unstaged(&self) -> Vec<FileChange> {
        self.state.lock().unwrap().unstaged.clone()
    }

    async fn diff(&self, staged: bool) -> String {
        if staged {
            self.state.lock().unwrap().diff.clone()
        } else {
            String::new()
        }
    }

    async fn stage(&self, path: &Path) -> Result<(), VcsError> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(pos) = state.unstaged.iter().position(|f| f.path == path) {
                let mut file = state.unstaged.remove(pos);
                if file.status == FileStatus::Untracked {
                    file.status = FileStatus::Added;
                }
                state.staged.retain(|f| f.path != path);
                state.staged.push(file);
            }
        }
        self.observers.notify();
        Ok(())
    }

    async fn unstage(&self, path: &Path) -> Result<(), VcsError> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(pos) = state.staged.iter().position(|f| f.path == path) {
                let mut file = state.staged.remove(pos);
                if file.status == FileStatus::Added {
                    file.status = FileStatus::Untracked;
                }
                state.unstaged.push(file);
            }
        }
        self.observers.notify();
        Ok(())
    }

    async fn discard(&self, path: &Path) -> Result<(), VcsError> {
        self.state.lock().unwrap().unstaged.retain(|f| f.path != path);
        self.observers.notify();
        Ok(())
    }

    async fn stage_all(&self) -> Result<(), VcsError> {
        let paths: Vec<PathBuf> = self
            .state
            .lock()
            .unwrap()
            .unstaged
            .iter()
            .map(|f| f.path.clone())
            .collect();
        for path in paths {
            self.stage(&path).await?;
        }
        Ok(())
    }

    async fn unstage_all(&self) -> Result<(), VcsError> {
        let paths: Vec<PathBuf> = self
            .state
            .lock()
            .unwrap()
            .staged
            .iter()
            .map(|f| f.path.clone())
            .collect();
        for path in paths {
            self.unstage(&path).await?;
        }
        Ok(())
    }

    async fn discard_all(&self) -> Result<(), VcsError> {
        self.state.lock().unwrap().unstaged.clear();
        self.observers.notify();
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitReport, VcsError> {
        if message.trim().is_empty() {
            return Err(VcsError::EmptyMessage);
        }
        {
            let mut state = self.state.lock().unwrap();
            if state.staged.is_empty() {
                return Err(VcsError::NoStagedChanges);
            }
            state.staged.clear();
            state.commits.push(message.to_string());
        }
        self.observers.notify();
        Ok(CommitReport {
            committed: vec![PathBuf::from("/fake")],
            failed: Vec::new(),
        })
    }

    fn on_change(&self, callback: ChangeCallback) {
        self.observers.register(callback);
    }
}

/// AI backend returning a canned reply and recording every prompt.
pub struct FakeAi {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
    /// Released before replying when set, to hold a generation in flight.
    pub gate: Option<Arc<tokio::sync::Notify>>,
}

impl FakeAi {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<tokio::sync::Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AiGateway for FakeAi {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply
            .clone()
            .map_err(GenerationError::Network)
    }
}

/// Surface that records everything it is asked to show.
#[derive(Default)]
pub struct RecordingSurface {
    pub published: Mutex<Vec<Projection>>,
    pub messages: Mutex<Vec<String>>,
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingSurface {
    pub fn last_projection(&self) -> Option<Projection> {
        self.published.lock().unwrap().last().cloned()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl PresentationSurface for RecordingSurface {
    fn publish(&self, projection: &Projection) {
        self.published.lock().unwrap().push(projection.clone());
    }

    fn set_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
