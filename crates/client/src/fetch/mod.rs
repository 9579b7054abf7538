//! Resilient JSON fetch pipeline.
//!
//! ### Attempt
//! - Each attempt is throttled globally, then raced against a per-attempt
//!   timeout (default 11s). Losing the race drops, and so aborts, the request.
//! - Non-2xx statuses and unparseable bodies become classified errors.
//!
//! ### Retry
//! - Offline fails immediately, no attempt is spent.
//! - Everything else is retried up to `retries` times (default 3) with
//!   `base(class) * 2^attempt + jitter(0..200ms)`.
//! - Retries after anything but a 429 carry a fresh `_bust` parameter.

pub mod backoff;
pub mod key;
pub mod throttle;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use serde_json::Value;
use url::Url;

pub use backoff::{BUST_PARAM, BackoffAttempt, FailureClass, backoff_delay, retry_url};
pub use key::request_key;
pub use throttle::RequestThrottle;

use feedback_core::{ClientConfig, Error};

/// Raw HTTP response as seen by the fetcher.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Bytes,
}

/// Transport-level failures, before any HTTP status is known.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("no network interface available")]
    Offline,

    #[error("network error: {0}")]
    Network(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Error::Timeout,
            TransportError::Offline => Error::Offline,
            TransportError::Network(msg) => Error::Network(msg),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() && is_offline_cause(&err) {
            TransportError::Offline
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Whether a connect failure means the host has no usable network: an
/// unreachable or down network, or a name lookup that could not run.
pub fn is_offline_cause(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>()
            && matches!(
                io.kind(),
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown | io::ErrorKind::HostUnreachable
            )
        {
            return true;
        }
        let message = err.to_string();
        if message.starts_with("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        current = err.source();
    }
    false
}

/// Something that can issue a GET and report connectivity.
///
/// Lets the retry machinery run against a scripted backend in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError>;

    /// Whether a network interface is available right now.
    fn is_online(&self) -> bool {
        true
    }
}

/// Connectivity check consulted before every attempt.
pub type OnlineCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Production transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
    online: Option<OnlineCheck>,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("http", &self.http)
            .field("online_check", &self.online.is_some())
            .finish()
    }
}

impl ReqwestTransport {
    /// Build the HTTP client. Timeouts are enforced by the fetcher, not here.
    pub fn new(user_agent: &str) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, online: None })
    }

    /// Ask `check` for connectivity before each attempt, e.g. the embedding
    /// app's network-state signal. Without one the host is assumed online and
    /// only connect failures can report `offline`.
    pub fn with_online_check(mut self, check: OnlineCheck) -> Self {
        self.online = Some(check);
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpReply { status, body })
    }

    fn is_online(&self) -> bool {
        self.online.as_ref().is_none_or(|check| check())
    }
}

/// Retry knobs for one logical fetch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Upper bound of the jitter added to every backoff delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 3, timeout: Duration::from_millis(11_000), max_jitter: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self { retries: config.retries, timeout: config.timeout(), max_jitter: config.jitter() }
    }

    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Map an HTTP status to success or a classified error.
pub fn classify_status(status: u16) -> Result<(), Error> {
    match status {
        200..=299 => Ok(()),
        429 => Err(Error::RateLimited),
        503 => Err(Error::Overloaded),
        status => Err(Error::HttpError { status }),
    }
}

/// Performs logical "fetch JSON" operations with timeout, classification
/// and backoff. Does not cache; see [`crate::cache::ResponseCache`].
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    throttle: RequestThrottle,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn Transport>, throttle: RequestThrottle, policy: RetryPolicy) -> Self {
        Self { transport, throttle, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url` as JSON, accepting any well-formed body.
    pub async fn fetch_json(&self, url: &Url) -> Result<Value, Error> {
        self.fetch_json_with(url, |_| Ok(())).await
    }

    /// Fetch `url` as JSON and require `validate` to accept the body.
    ///
    /// A rejected body counts as an `invalid_response` failure and is
    /// retried like one.
    pub async fn fetch_json_with<V>(&self, url: &Url, validate: V) -> Result<Value, Error>
    where
        V: Fn(&Value) -> Result<(), Error>,
    {
        let attempts = self.policy.attempts();
        let nonce = fastrand::u64(..);
        let mut current = url.clone();
        let mut attempt: u32 = 0;

        loop {
            if !self.transport.is_online() {
                tracing::warn!(url = %url, attempt, "offline, not attempting request");
                return Err(Error::Offline);
            }

            let outcome = self.throttle.schedule(self.attempt(&current, attempt)).await;
            let err = match outcome.and_then(|value| validate(&value).map(|()| value)) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if matches!(err, Error::Offline) {
                return Err(err);
            }

            if attempt + 1 >= attempts {
                tracing::warn!(url = %url, attempts, kind = %err.kind(), "giving up: {}", err);
                return Err(err);
            }

            let class = FailureClass::of(&err);
            let backoff = BackoffAttempt::schedule(class, attempt, self.policy.max_jitter);
            tracing::warn!(
                url = %url,
                attempt = backoff.attempt_index,
                delay_ms = backoff.delay.as_millis() as u64,
                kind = %err.kind(),
                "attempt failed, retrying"
            );
            tokio::time::sleep(backoff.delay).await;

            attempt += 1;
            current = retry_url(&current, class, attempt, nonce);
        }
    }

    async fn attempt(&self, url: &Url, attempt: u32) -> Result<Value, Error> {
        tracing::debug!(url = %url, attempt, "starting attempt");

        let reply = match tokio::time::timeout(self.policy.timeout, self.transport.get(url)).await {
            Err(_) => return Err(Error::Timeout),
            Ok(result) => result?,
        };

        classify_status(reply.status)?;

        serde_json::from_slice(&reply.body).map_err(|e| Error::InvalidResponse(format!("body is not JSON: {}", e)))
    }
}
