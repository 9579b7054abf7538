//! Client configuration with layered loading.
//!
//! Uses figment to merge, highest precedence first:
//!
//! 1. Environment variables (FEEDBACK_BOARD_*)
//! 2. TOML config file (if FEEDBACK_BOARD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{ConfigError, validate_base_url};

/// Settings for the reviews client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Serverless endpoint serving the review data.
    ///
    /// Set via FEEDBACK_BOARD_BASE_URL. May also be set at runtime on the client.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-attempt timeout in milliseconds.
    ///
    /// Set via FEEDBACK_BOARD_TIMEOUT_MS.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt.
    ///
    /// Set via FEEDBACK_BOARD_RETRIES.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Minimum gap between the starts of two network attempts.
    ///
    /// Set via FEEDBACK_BOARD_MIN_GAP_MS.
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,

    /// Upper bound of the random jitter added to each backoff delay.
    ///
    /// Set via FEEDBACK_BOARD_JITTER_MS.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Lifetime of a cached response.
    ///
    /// Set via FEEDBACK_BOARD_CACHE_TTL_MS.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// User-Agent header sent with every request.
    ///
    /// Set via FEEDBACK_BOARD_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_ms() -> u64 {
    11_000
}

fn default_retries() -> u32 {
    3
}

fn default_min_gap_ms() -> u64 {
    180
}

fn default_jitter_ms() -> u64 {
    200
}

fn default_cache_ttl_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    "feedback-board/0.1".into()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            min_gap_ms: default_min_gap_ms(),
            jitter_ms: default_jitter_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Total attempts per logical fetch (`retries + 1`).
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FEEDBACK_BOARD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FEEDBACK_BOARD_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        tracing::debug!(
            base_url = ?config.base_url,
            timeout_ms = config.timeout_ms,
            retries = config.retries,
            "loaded client configuration"
        );

        Ok(config)
    }

    /// Base endpoint, or a `Missing` error naming how to set it.
    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "base_url".into(),
                hint: "Set FEEDBACK_BOARD_BASE_URL or call set_base_url".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout_ms, 11_000);
        assert_eq!(config.retries, 3);
        assert_eq!(config.min_gap_ms, 180);
        assert_eq!(config.jitter_ms, 200);
        assert_eq!(config.cache_ttl_ms, 60_000);
        assert_eq!(config.user_agent, "feedback-board/0.1");
    }

    #[test]
    fn test_durations() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(11_000));
        assert_eq!(config.min_gap(), Duration::from_millis(180));
        assert_eq!(config.attempts(), 4);
    }

    #[test]
    fn test_require_base_url_missing() {
        let config = ClientConfig::default();
        assert!(matches!(config.require_base_url(), Err(ConfigError::Missing { .. })));

        let config = ClientConfig { base_url: Some("  ".into()), ..Default::default() };
        assert!(config.require_base_url().is_err());
    }

    #[test]
    fn test_require_base_url_present() {
        let config = ClientConfig { base_url: Some("https://example.com/exec".into()), ..Default::default() };
        assert_eq!(config.require_base_url().unwrap(), "https://example.com/exec");
    }

    #[test]
    fn test_load_layers_env_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("board.toml", "retries = 5\ntimeout_ms = 4000\n")?;
            jail.set_env("FEEDBACK_BOARD_CONFIG_FILE", "board.toml");
            jail.set_env("FEEDBACK_BOARD_TIMEOUT_MS", "9000");
            jail.set_env("FEEDBACK_BOARD_BASE_URL", "https://script.example.com/exec");

            let config = ClientConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.retries, 5);
            assert_eq!(config.timeout_ms, 9000);
            assert_eq!(config.base_url.as_deref(), Some("https://script.example.com/exec"));
            assert_eq!(config.min_gap_ms, 180);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FEEDBACK_BOARD_TIMEOUT_MS", "5");
            let result = ClientConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }

    #[test]
    fn test_load_with_empty_base_url_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FEEDBACK_BOARD_BASE_URL", "");
            let config = ClientConfig::load().map_err(|e| e.to_string())?;
            assert!(config.require_base_url().is_err());
            Ok(())
        });
    }
}
