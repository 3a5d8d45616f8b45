//! Exponential backoff retry decorator for AI backends.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::GenerationError;

use super::AiGateway;

const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to `max_attempts` times. An error for which
/// `is_permanent` holds is returned at once, unwrapped. When every attempt
/// fails the last error is passed to `wrap_exhausted`.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    max_attempts: u32,
    mut attempt: F,
    is_permanent: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if is_permanent(&e) => return Err(e),
            Err(e) if attempts >= max_attempts => return Err(wrap_exhausted(e)),
            Err(e) => {
                warn!("Attempt {attempts}/{max_attempts} failed: {e}");
                if let Some(wait_duration) = backoff.next_backoff() {
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }
}

/// Wraps a backend and retries failed generations.
pub struct WithRetry<G> {
    inner: G,
    max_attempts: u32,
}

impl<G: AiGateway> WithRetry<G> {
    pub fn new(inner: G, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl<G: AiGateway> AiGateway for WithRetry<G> {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        retry_with_backoff(
            self.max_attempts,
            || self.inner.generate_text(prompt),
            GenerationError::is_permanent,
            |e| GenerationError::RetriesExhausted(Box::new(e)),
        )
        .await
    }
}
