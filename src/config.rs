//! Runtime configuration read from the environment.
//!
//! Every setting has a default; invalid numeric values log a warning and fall
//! back to it. Command-line flags are applied on top by the binary.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::ai::Provider;
use crate::error::ConfigError;

pub const PROVIDER_ENV_VAR: &str = "COMMITCRAFT_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "COMMITCRAFT_API_KEY";
pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "COMMITCRAFT_BASE_URL";
pub const MODEL_ENV_VAR: &str = "COMMITCRAFT_MODEL";
pub const TEMPERATURE_ENV_VAR: &str = "COMMITCRAFT_TEMPERATURE";
pub const TIMEOUT_ENV_VAR: &str = "COMMITCRAFT_TIMEOUT";
pub const RETRIES_ENV_VAR: &str = "COMMITCRAFT_RETRIES";
pub const POLL_INTERVAL_ENV_VAR: &str = "COMMITCRAFT_POLL_INTERVAL_MS";

pub const DEFAULT_BASE_URL: &str = "https://hugbot-ai.vercel.app/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3.2";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Settings for the AI backend and the change watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Total generation attempts; 1 disables retrying.
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl Config {
    /// Load settings from `COMMITCRAFT_*` variables.
    ///
    /// An unknown provider name is the only hard error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let provider = match non_empty_var(PROVIDER_ENV_VAR) {
            Some(value) => value.parse()?,
            None => defaults.provider,
        };

        let api_key = non_empty_var(API_KEY_ENV_VAR).or_else(|| non_empty_var(OPENAI_API_KEY_ENV_VAR));

        Ok(Self {
            provider,
            api_key,
            base_url: non_empty_var(BASE_URL_ENV_VAR).unwrap_or(defaults.base_url),
            model: non_empty_var(MODEL_ENV_VAR).unwrap_or(defaults.model),
            temperature: parse_var(TEMPERATURE_ENV_VAR, defaults.temperature),
            timeout: Duration::from_secs(parse_var(TIMEOUT_ENV_VAR, DEFAULT_TIMEOUT_SECS)),
            max_attempts: parse_var(RETRIES_ENV_VAR, defaults.max_attempts),
            poll_interval: Duration::from_millis(parse_var(
                POLL_INTERVAL_ENV_VAR,
                DEFAULT_POLL_INTERVAL_MS,
            )),
        })
    }

    /// Reject values no backend can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".to_string(),
                value: self.temperature.to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retries".to_string(),
                value: "0".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "poll interval".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match non_empty_var(key) {
        Some(v) => match v.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {}", key, v, default);
                default
            }
        },
        None => default,
    }
}
