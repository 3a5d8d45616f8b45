//! commitcraft - keeps staged and unstaged changes in sync with a presentation
//! surface and writes commit messages from staged diffs with an AI backend.
//!
//! # Overview
//!
//! A [`VcsGateway`] reports file changes and applies index mutations, an
//! [`AiGateway`] turns a prompt into text, the [`CommitMessageOrchestrator`]
//! composes the two, and the [`SyncPresenter`] mirrors every backend change to
//! a [`PresentationSurface`] while relaying user intents back to the backend.

pub mod ai;
pub mod commit;
pub mod config;
pub mod error;
pub mod presenter;
pub mod status;
pub mod vcs;

// Re-export commonly used types
pub use ai::{AiGateway, Provider, build_gateway};
pub use commit::{CommitMessage, CommitMessageOrchestrator, Generation};
pub use config::Config;
pub use error::{ConfigError, GenerationError, PresenterError, VcsError};
pub use presenter::{FileId, Notice, NoticeLevel, PresentationSurface, Projection, SyncPresenter};
pub use status::{FileStatus, map_status};
pub use vcs::{ChangeSet, CommitReport, FileChange, GitGateway, Partition, VcsGateway};
