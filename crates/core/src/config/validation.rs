//! Configuration validation rules.
//!
//! Applied to `ClientConfig` after it has been loaded from environment,
//! files, or defaults.

use crate::config::ClientConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Check that `raw` is an absolute http(s) URL.
pub fn validate_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ConfigError::Invalid { field: "base_url".into(), reason: format!("unsupported scheme: {scheme}") }),
    }
}

impl ClientConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `base_url` is set, non-blank, and not an absolute http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `retries` exceeds 10
    /// - `min_gap_ms` exceeds one minute, or `jitter_ms` exceeds 5 seconds
    /// - `cache_ttl_ms` is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = self.base_url.as_deref().filter(|url| !url.trim().is_empty()) {
            validate_base_url(base_url)?;
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.retries > 10 {
            return Err(ConfigError::Invalid { field: "retries".into(), reason: "must not exceed 10".into() });
        }

        if self.min_gap_ms > 60_000 {
            return Err(ConfigError::Invalid { field: "min_gap_ms".into(), reason: "must not exceed 60000ms".into() });
        }

        if self.jitter_ms > 5_000 {
            return Err(ConfigError::Invalid { field: "jitter_ms".into(), reason: "must not exceed 5000ms".into() });
        }

        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_ms".into(), reason: "must be greater than 0".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.retries == 0 {
            tracing::warn!(timeout_ms = self.timeout_ms, "retries is 0; a single slow attempt will fail the request");
        }

        Ok(())
    }
}
