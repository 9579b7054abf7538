//! Request keys for the response cache and the in-flight map.

use super::backoff::BUST_PARAM;
use url::Url;

/// Query parameters that only exist to defeat caches.
pub const CACHE_BUST_PARAMS: &[&str] = &["cb", BUST_PARAM];

/// Canonical key for a request URL.
///
/// Normalization steps:
/// 1. Drop cache-bust parameters (`cb`, `_bust`)
/// 2. Sort remaining query pairs by name (stable, so repeated names keep their order)
/// 3. Remove fragment
///
/// The url crate already lower-cases scheme and host while parsing.
pub fn request_key(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_bust_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut canonical = url.clone();
    canonical.set_fragment(None);
    if pairs.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    canonical.into()
}

pub fn is_bust_param(name: &str) -> bool {
    CACHE_BUST_PARAMS.contains(&name)
}
