//! Client configuration.
//!
//! Every field has a default, so a config can be deserialized from a partial
//! document or assembled in code with struct-update syntax. Durations are
//! written in milliseconds under `timeout_ms` and `retry_after_ms`.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Rust SDK client";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the API, e.g. `https://cp.example.com/api/v1/`.
    pub base_url: String,
    pub user_agent: String,
    /// Whole-request timeout enforced by the transport, read from
    /// `timeout_ms`.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retries: u32,
    /// Fixed delay between attempts, read from `retry_after_ms`.
    #[serde(rename = "retry_after_ms", with = "millis")]
    pub retry_after: Duration,
    /// Absolute cap on attempts, whatever `retries` says.
    pub max_attempts_ceiling: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/api/v1/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(35),
            retries: 5,
            retry_after: Duration::from_secs(1),
            max_attempts_ceiling: 10,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Build a config from `SOLUS_*` environment variables.
    ///
    /// `SOLUS_BASE_URL` is required; `SOLUS_RETRIES`, `SOLUS_RETRY_AFTER_MS`
    /// and `SOLUS_TIMEOUT_SECS` override the defaults when set.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var("SOLUS_BASE_URL")
            .map_err(|_| ApiError::Config("SOLUS_BASE_URL is not set".to_string()))?;
        let mut config = Self::new(&base_url);

        if let Some(retries) = env_number("SOLUS_RETRIES")? {
            config.retries = u32::try_from(retries)
                .map_err(|_| ApiError::Config(format!("SOLUS_RETRIES is out of range: {retries}")))?;
        }
        if let Some(ms) = env_number("SOLUS_RETRY_AFTER_MS")? {
            config.retry_after = Duration::from_millis(ms);
        }
        if let Some(secs) = env_number("SOLUS_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_retry_policy(mut self, retries: u32, retry_after: Duration) -> Self {
        self.retries = retries;
        self.retry_after = retry_after;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: self.retry_after,
            ceiling: self.max_attempts_ceiling,
        }
    }

    /// Parse `base_url`, forcing a trailing `/` so relative paths join
    /// beneath it rather than replacing its last segment.
    pub fn parsed_base_url(&self) -> Result<Url, ApiError> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| ApiError::Config(format!("invalid base url {:?}: {e}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "base url {:?} cannot be a base",
                self.base_url
            )));
        }
        Ok(url)
    }
}

fn env_number(name: &str) -> Result<Option<u64>, ApiError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::Config(format!("{name} must be a non-negative integer, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
