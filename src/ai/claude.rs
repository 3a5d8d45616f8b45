//! Claude Code CLI backend.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::GenerationError;

use super::AiGateway;

/// Claude CLI JSON envelope when using --output-format json.
#[derive(Deserialize)]
struct ClaudeCliResponse {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Runs `claude -p <prompt> --output-format json` and returns the result text.
pub struct ClaudeCliGateway {
    binary: PathBuf,
    timeout: Duration,
}

impl ClaudeCliGateway {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary("claude", timeout)
    }

    /// Use a specific executable instead of `claude` from `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AiGateway for ClaudeCliGateway {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let binary = which::which(&self.binary).map_err(|_| GenerationError::NotInstalled)?;
        let timeout_secs = self.timeout.as_secs();

        debug!("Running {} with a {} char prompt", binary.display(), prompt.len());

        let output = timeout(
            self.timeout,
            Command::new(&binary)
                .arg("-p")
                .arg(prompt)
                .arg("--output-format")
                .arg("json")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| GenerationError::Timeout(timeout_secs))?
        .map_err(GenerationError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(GenerationError::NonZeroExit { code, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        parse_response(&stdout)
    }
}

/// Unwrap the CLI envelope, falling back to the raw output.
fn parse_response(response: &str) -> Result<String, GenerationError> {
    let content = match serde_json::from_str::<ClaudeCliResponse>(response) {
        Ok(envelope) if envelope.is_error => {
            return Err(GenerationError::InvalidResponse(format!(
                "Claude reported an error: {}",
                envelope.result
            )));
        }
        Ok(envelope) => envelope.result,
        Err(_) => response.to_string(),
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    Ok(content.to_string())
}
