//! Turns the staged diff into a generated commit message.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ai::AiGateway;
use crate::error::GenerationError;
use crate::vcs::VcsGateway;

use super::prompt::build_commit_prompt;

pub const NOTHING_STAGED_GUIDANCE: &str =
    "Stage your changes before generating a commit message.";
pub const DIFF_UNAVAILABLE_GUIDANCE: &str =
    "Could not retrieve the diff of the staged changes.";

/// Text produced by the AI backend, kept exactly as returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage(String);

impl CommitMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a generation request.
///
/// The two guidance variants are expected outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Message(CommitMessage),
    /// No files are staged.
    NothingStaged,
    /// Files are staged but their diff came back empty.
    DiffUnavailable,
}

impl Generation {
    /// The message for `Message`, or the guidance text otherwise.
    pub fn text(&self) -> &str {
        match self {
            Generation::Message(message) => message.as_str(),
            Generation::NothingStaged => NOTHING_STAGED_GUIDANCE,
            Generation::DiffUnavailable => DIFF_UNAVAILABLE_GUIDANCE,
        }
    }

    pub fn is_guidance(&self) -> bool {
        !matches!(self, Generation::Message(_))
    }
}

/// Composes the version-control and AI ports into the generation use case.
///
/// Stateless: each call does two reads and at most one AI request. Failed
/// generations are returned to the caller unchanged and never retried here.
pub struct CommitMessageOrchestrator {
    vcs: Arc<dyn VcsGateway>,
    ai: Arc<dyn AiGateway>,
}

impl CommitMessageOrchestrator {
    pub fn new(vcs: Arc<dyn VcsGateway>, ai: Arc<dyn AiGateway>) -> Self {
        Self { vcs, ai }
    }

    pub async fn generate(&self) -> Result<Generation, GenerationError> {
        let staged = self.vcs.list_staged().await;
        if staged.is_empty() {
            debug!("Nothing staged, skipping generation");
            return Ok(Generation::NothingStaged);
        }

        let diff = self.vcs.diff(true).await;
        if diff.trim().is_empty() {
            debug!("{} staged files but the diff is empty", staged.len());
            return Ok(Generation::DiffUnavailable);
        }

        let prompt = build_commit_prompt(&diff);
        debug!(
            "Generating commit message for {} staged files ({} char prompt)",
            staged.len(),
            prompt.len()
        );

        let text = self.ai.generate_text(&prompt).await?;
        Ok(Generation::Message(CommitMessage::new(text)))
    }
}
