//! Reviews API client.
//!
//! Public surface consumed by the feedback board UI: paginated lists, the
//! latest reviews for a platform, and the aggregate rating summary.
//!
//! ### Pipeline
//!
//! - Build the query (`mode`, `plat`, `page`, `limit`, passthrough options)
//! - Look up the response cache by canonical request key, joining any
//!   in-flight fetch for the same key
//! - On miss, fetch through the throttled, retrying fetcher; the envelope
//!   shape is validated per attempt
//! - Decode the envelope and normalize every item
//!
//! Each `ReviewsClient` owns its own cache, in-flight map and throttle, so
//! independent instances never share state. Clones share one instance.

pub mod request;
pub mod response;

pub use request::{MAX_LIMIT, MAX_PAGE, Mode, QueryOptions, ReviewQuery};
pub use response::{ListEnvelope, ListPayload, MetaPayload};

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use feedback_core::config::validate_base_url;
use feedback_core::{ClientConfig, Error, MetaSummary, NormalizedItem, ReviewPage};

use crate::cache::{CacheMode, ResponseCache};
use crate::fetch::{ReqwestTransport, RequestThrottle, RetryPolicy, RetryingFetcher, Transport, request_key};

/// Default page size for [`ReviewsClient::list`].
pub const DEFAULT_LIST_LIMIT: u32 = 1;

/// Default page size for [`ReviewsClient::list_meta`].
pub const DEFAULT_PAGE_LIMIT: u32 = 5;

type Validator = fn(&Value) -> Result<(), Error>;

struct Inner {
    fetcher: RetryingFetcher,
    cache: ResponseCache,
    base_url: RwLock<Option<Url>>,
    ttl: Duration,
}

/// Client for the reviews endpoint.
#[derive(Clone)]
pub struct ReviewsClient {
    inner: Arc<Inner>,
}

impl ReviewsClient {
    /// Create a client talking HTTP through reqwest.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client from `FEEDBACK_BOARD_*` configuration.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(&ClientConfig::load()?)
    }

    /// Create a client over any transport.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        config.validate()?;

        let base_url = match config.base_url.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(validate_base_url(raw)?),
            _ => None,
        };

        let fetcher =
            RetryingFetcher::new(transport, RequestThrottle::new(config.min_gap()), RetryPolicy::from_config(config));

        Ok(Self {
            inner: Arc::new(Inner {
                fetcher,
                cache: ResponseCache::new(),
                base_url: RwLock::new(base_url),
                ttl: config.cache_ttl(),
            }),
        })
    }

    /// Currently configured endpoint.
    pub fn base_url(&self) -> Option<Url> {
        self.inner.base_url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Point the client at a different endpoint. Cached responses for the
    /// old endpoint are keyed by their full URL and simply stop matching.
    pub fn set_base_url(&self, raw: &str) -> Result<(), Error> {
        let url = validate_base_url(raw)?;
        tracing::debug!(base_url = %url, "base url updated");
        *self.inner.base_url.write().unwrap_or_else(PoisonError::into_inner) = Some(url);
        Ok(())
    }

    pub fn clear_base_url(&self) {
        *self.inner.base_url.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// One page of normalized reviews for `platform`.
    ///
    /// `page` is clamped to `1..=1_000_000` and `limit` to `1..=50`. Without
    /// options, `fast=1` is sent.
    pub async fn list(
        &self, platform: &str, page: u32, limit: u32, opts: Option<&QueryOptions>,
    ) -> Result<Vec<NormalizedItem>, Error> {
        let query = ReviewQuery::list(platform, page, limit, opts)?;
        let payload = self.fetch_list(&query, opts).await?;
        Ok(payload.into_items())
    }

    /// Like [`ReviewsClient::list`], plus `hasMore` and `total`.
    pub async fn list_meta(
        &self, platform: &str, page: u32, limit: u32, opts: Option<&QueryOptions>,
    ) -> Result<ReviewPage, Error> {
        let query = ReviewQuery::list(platform, page, limit, opts)?;
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let payload = self.fetch_list(&query, opts).await?;
        Ok(payload.into_page(limit))
    }

    /// The newest `limit` reviews for `platform`, on the backend's cheap path.
    pub async fn latest(&self, platform: &str, limit: u32) -> Result<Vec<NormalizedItem>, Error> {
        let opts = QueryOptions::new().fast(true);
        let mut items = self.list(platform, 1, limit, Some(&opts)).await?;
        items.truncate(request::clamp_limit(limit) as usize);
        Ok(items)
    }

    /// Aggregate rating summary; `None` covers every platform.
    pub async fn meta(&self, platform: Option<&str>, opts: Option<&QueryOptions>) -> Result<MetaSummary, Error> {
        let query = ReviewQuery::meta(platform, opts);
        let value = self.fetch(&query, opts, MetaPayload::validate).await?;
        Ok(MetaPayload::decode(&value)?.into_summary())
    }

    async fn fetch_list(&self, query: &ReviewQuery, opts: Option<&QueryOptions>) -> Result<ListPayload, Error> {
        let value = self.fetch(query, opts, ListPayload::validate).await?;
        ListPayload::decode(&value)
    }

    async fn fetch(
        &self, query: &ReviewQuery, opts: Option<&QueryOptions>, validate: Validator,
    ) -> Result<Arc<Value>, Error> {
        let base = self.base_url().ok_or_else(|| {
            Error::Configuration("reviews endpoint is not configured; set FEEDBACK_BOARD_BASE_URL".into())
        })?;

        let url = query.to_url(&base);
        let key = request_key(&url);
        let mode = if opts.is_some_and(QueryOptions::is_refresh) { CacheMode::Bypass } else { CacheMode::Normal };

        tracing::debug!(
            mode = query.mode.as_str(),
            platform = ?query.platform,
            page = ?query.page,
            limit = ?query.limit,
            "requesting reviews"
        );

        let inner = Arc::clone(&self.inner);
        self.inner
            .cache
            .fetch_json_with_mode(&key, self.inner.ttl, mode, move || async move {
                inner.fetcher.fetch_json_with(&url, validate).await
            })
            .await
    }
}
