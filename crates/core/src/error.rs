//! Unified error types for the feedback board client.
//!
//! Every terminal failure surfaced to a UI collaborator is one of these
//! variants. Display strings use a stable `CODE: message` form.

use crate::config::ConfigError;

/// Failure classes, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Offline,
    Timeout,
    RateLimited,
    Overloaded,
    HttpError,
    InvalidResponse,
    Network,
    Configuration,
}

impl ErrorKind {
    /// Snake-case identifier for logs and UI branching.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Offline => "offline",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Overloaded => "overloaded",
            ErrorKind::HttpError => "http_error",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Network => "network",
            ErrorKind::Configuration => "configuration_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the reviews client.
///
/// `Clone` so that one failed request can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No network interface available. Never retried.
    #[error("OFFLINE: no network connection available")]
    Offline,

    /// An attempt exceeded its deadline and was aborted.
    #[error("TIMEOUT: the reviews service took too long to respond")]
    Timeout,

    /// Backend answered HTTP 429.
    #[error("RATE_LIMITED: too many requests")]
    RateLimited,

    /// Backend answered HTTP 503.
    #[error("OVERLOADED: service unavailable")]
    Overloaded,

    /// Any other non-2xx status.
    #[error("HTTP_ERROR: status {status}")]
    HttpError { status: u16 },

    /// Body was not JSON, or not one of the expected envelopes.
    #[error("INVALID_RESPONSE: {0}")]
    InvalidResponse(String),

    /// Transport failure that is neither offline nor a timeout.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Missing platform argument, unset endpoint or bad settings.
    #[error("CONFIG_ERROR: {0}")]
    Configuration(String),
}

const TIMEOUT_MESSAGE: &str = "The reviews are taking too long to load. Please try again.";
const OFFLINE_MESSAGE: &str = "You appear to be offline. Check your connection and try again.";
const GENERIC_MESSAGE: &str = "We couldn't load the reviews right now.";

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Offline => ErrorKind::Offline,
            Error::Timeout => ErrorKind::Timeout,
            Error::RateLimited => ErrorKind::RateLimited,
            Error::Overloaded => ErrorKind::Overloaded,
            Error::HttpError { .. } => ErrorKind::HttpError,
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::Network(_) => ErrorKind::Network,
            Error::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Timeout => TIMEOUT_MESSAGE,
            Error::Offline => OFFLINE_MESSAGE,
            _ => GENERIC_MESSAGE,
        }
    }

    /// Whether the UI should offer a manual retry affordance.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(self, Error::Offline | Error::Timeout)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::HttpError { status: 500 };
        assert!(err.to_string().contains("HTTP_ERROR"));
        assert!(err.to_string().contains("500"));

        let err = Error::InvalidResponse("expected value at line 1".to_string());
        assert!(err.to_string().starts_with("INVALID_RESPONSE:"));
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(Error::Offline.kind().as_str(), "offline");
        assert_eq!(Error::RateLimited.kind().as_str(), "rate_limited");
        assert_eq!(Error::Overloaded.kind().as_str(), "overloaded");
        assert_eq!(Error::HttpError { status: 404 }.kind().as_str(), "http_error");
        assert_eq!(Error::Configuration("x".into()).kind().as_str(), "configuration_error");
    }

    #[test]
    fn test_timeout_message_is_distinct() {
        let timeout = Error::Timeout.user_message();
        for other in [
            Error::Offline,
            Error::RateLimited,
            Error::Overloaded,
            Error::HttpError { status: 500 },
            Error::InvalidResponse("bad".into()),
            Error::Network("reset".into()),
        ] {
            assert_ne!(other.user_message(), timeout, "{other}");
        }
    }

    #[test]
    fn test_retry_affordance() {
        assert!(Error::Offline.is_retryable_by_user());
        assert!(Error::Timeout.is_retryable_by_user());
        assert!(!Error::Overloaded.is_retryable_by_user());
    }

    #[test]
    fn test_from_config_error() {
        let err: Error = ConfigError::Missing { field: "base_url".into(), hint: "set it".into() }.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("base_url"));
    }
}
