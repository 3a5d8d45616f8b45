//! OpenAI-compatible chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenerationError;

use super::AiGateway;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Sends the prompt as a single user message to `{base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiGateway {
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        model: String,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to build HTTP client, using defaults: {e}");
                Client::new()
            }
        };

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout.as_secs())
        } else {
            GenerationError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl AiGateway for OpenAiGateway {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!("Requesting completion from {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    GenerationError::Authentication(text)
                }
                StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(text),
                _ => GenerationError::Api {
                    status: status.as_u16(),
                    body: text,
                },
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("No content in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(content)
    }
}
