//! Query construction for the reviews endpoint.

use url::Url;

use feedback_core::Error;

/// Largest page number sent to the backend.
pub const MAX_PAGE: u32 = 1_000_000;

/// Largest page size the backend accepts.
pub const MAX_LIMIT: u32 = 50;

/// Parameters the client always sets itself; passthrough options cannot override them.
const RESERVED_PARAMS: &[&str] = &["mode", "plat", "page", "limit"];

/// Extra query parameters and client-side flags for one call.
///
/// Parameters are forwarded in insertion order. Setting a key twice keeps the
/// position of the first and the value of the last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    params: Vec<(String, String)>,
    refresh: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward `key=value` to the backend.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// `fast=1` skips the exact total count on the backend, `fast=0` computes it.
    pub fn fast(self, fast: bool) -> Self {
        self.param("fast", if fast { "1" } else { "0" })
    }

    /// Ask the backend to skip its own response cache.
    pub fn nocache(self) -> Self {
        self.param("nocache", "1")
    }

    /// Skip the client-side cache for this call; the fresh result is still cached.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn is_refresh(&self) -> bool {
        self.refresh
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Backend operation selected by the `mode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Meta,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::List => "list",
            Mode::Meta => "meta",
        }
    }
}

/// Fully resolved query for one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    pub mode: Mode,
    pub platform: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub extra: Vec<(String, String)>,
}

pub fn clamp_page(page: u32) -> u32 {
    page.clamp(1, MAX_PAGE)
}

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

/// Trimmed, lower-cased platform tag, or a configuration error when blank.
pub fn require_platform(platform: &str) -> Result<String, Error> {
    let platform = platform.trim();
    if platform.is_empty() {
        return Err(Error::Configuration("platform is required (scs, shopee, ml, google or all)".into()));
    }
    Ok(platform.to_lowercase())
}

fn passthrough(opts: Option<&QueryOptions>) -> Vec<(String, String)> {
    match opts {
        None => vec![("fast".to_string(), "1".to_string())],
        Some(opts) => opts
            .params()
            .iter()
            .filter(|(k, _)| {
                let reserved = RESERVED_PARAMS.contains(&k.as_str());
                if reserved {
                    tracing::debug!(param = %k, "ignoring reserved query option");
                }
                !reserved
            })
            .cloned()
            .collect(),
    }
}

impl ReviewQuery {
    /// `mode=list` query with clamped pagination. Without options, `fast=1` is sent.
    pub fn list(platform: &str, page: u32, limit: u32, opts: Option<&QueryOptions>) -> Result<Self, Error> {
        Ok(Self {
            mode: Mode::List,
            platform: Some(require_platform(platform)?),
            page: Some(clamp_page(page)),
            limit: Some(clamp_limit(limit)),
            extra: passthrough(opts),
        })
    }

    /// `mode=meta` query. A missing platform summarizes every platform.
    pub fn meta(platform: Option<&str>, opts: Option<&QueryOptions>) -> Self {
        let platform = platform.map(str::trim).filter(|p| !p.is_empty()).map(str::to_lowercase);
        Self { mode: Mode::Meta, platform, page: None, limit: None, extra: passthrough(opts) }
    }

    /// Append this query to `base`, keeping any query the base already has.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("mode", self.mode.as_str());
            if let Some(platform) = &self.platform {
                pairs.append_pair("plat", platform);
            }
            if let Some(page) = self.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            for (k, v) in &self.extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }
}
