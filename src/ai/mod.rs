//! AI text-generation port and its backends.

pub mod claude;
pub mod openai;
pub mod retry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{ConfigError, GenerationError};

pub use claude::ClaudeCliGateway;
pub use openai::OpenAiGateway;
pub use retry::WithRetry;

/// Capability an AI backend must provide.
///
/// A failed call is always an error; an empty string is never returned in
/// place of one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: AiGateway + ?Sized> AiGateway for Arc<T> {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate_text(prompt).await
    }
}

/// Supported AI backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Any OpenAI-compatible chat-completions endpoint.
    #[default]
    OpenAi,
    /// The Claude Code CLI.
    Claude,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "claude" => Ok(Provider::Claude),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Build the configured backend, wrapped in [`WithRetry`] when more than one
/// attempt is configured.
pub fn build_gateway(config: &Config) -> Arc<dyn AiGateway> {
    let base: Arc<dyn AiGateway> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiGateway::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.temperature,
            config.timeout,
        )),
        Provider::Claude => Arc::new(ClaudeCliGateway::new(config.timeout)),
    };

    if config.max_attempts > 1 {
        Arc::new(WithRetry::new(base, config.max_attempts))
    } else {
        base
    }
}
