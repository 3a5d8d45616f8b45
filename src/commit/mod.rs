//! Commit message generation from staged diffs.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{CommitMessage, CommitMessageOrchestrator, Generation};
pub use prompt::build_commit_prompt;
