//! Error types for commitcraft modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from version-control operations.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Commit message is empty. Write a message before committing.")]
    EmptyMessage,

    #[error("No staged changes to commit")]
    NoStagedChanges,

    #[error("No git repository found at {0}")]
    NoRepository(PathBuf),

    #[error("Failed to open repository {path}: {source}")]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to read repository status: {0}")]
    Status(#[source] git2::Error),

    #[error("Failed to update the index: {0}")]
    Index(#[source] git2::Error),

    #[error("Failed to restore working tree: {0}")]
    Checkout(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    Commit(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    Signature(#[source] git2::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Commit failed in every repository with staged changes: {}", failures.join("; "))]
    CommitFailed { failures: Vec<String> },
}

/// Errors from AI text generation backends.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(
        "No API key configured. Set COMMITCRAFT_API_KEY (or OPENAI_API_KEY) or pass --api-key"
    )]
    MissingApiKey,

    #[error("Network error while contacting the AI backend: {0}")]
    Network(String),

    #[error("AI backend rejected the credentials: {0}")]
    Authentication(String),

    #[error("AI backend rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("AI backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AI backend returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("AI backend returned an empty completion")]
    EmptyResponse,

    #[error("Claude Code CLI not found. Install with: npm install -g @anthropic-ai/claude-code")]
    NotInstalled,

    #[error("Failed to spawn AI process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("AI process exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("AI request timed out after {0} seconds")]
    Timeout(u64),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<GenerationError>),
}

impl GenerationError {
    /// Errors that another attempt cannot fix: missing setup or rejected
    /// credentials.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey | Self::NotInstalled | Self::Authentication(_)
        )
    }
}

/// Errors raised by the presenter while relaying user intents.
#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("Unknown file identifier '{0}'")]
    UnknownFile(String),

    #[error("A commit message is already being generated")]
    GenerationInFlight,

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown AI provider '{0}' (expected 'openai' or 'claude')")]
    UnknownProvider(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
