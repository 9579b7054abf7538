//! Response envelopes returned by the reviews endpoint.
//!
//! List responses come either as a bare array of items or as a versioned
//! `{ v, items, hasMore, total }` envelope. Anything else is an
//! `invalid_response`, never an empty list.

use serde::Deserialize;
use serde_json::Value;

use feedback_core::{Error, MetaSummary, NormalizedItem, ReviewPage};

use crate::normalize::normalize;

/// Decoded list payload, before item normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload {
    Bare(Vec<Value>),
    Envelope(ListEnvelope),
}

/// Versioned list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope {
    /// Payload version. Informational only, so any JSON value is accepted.
    #[serde(default)]
    pub v: Option<Value>,
    pub items: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    pub has_more: Option<Value>,
    #[serde(default)]
    pub total: Option<Value>,
}

impl ListPayload {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        ListPayload::deserialize(value)
            .map_err(|_| Error::InvalidResponse("expected an items array or an {items: [...]} envelope".into()))
    }

    /// Shape check used as the fetcher's response validator.
    pub fn validate(value: &Value) -> Result<(), Error> {
        Self::decode(value).map(drop)
    }

    /// Normalized items; entries that are not objects are dropped.
    pub fn into_items(self) -> Vec<NormalizedItem> {
        let raw = match self {
            ListPayload::Bare(items) => items,
            ListPayload::Envelope(envelope) => envelope.items,
        };
        let total = raw.len();
        let items: Vec<_> = raw.iter().filter_map(normalize).collect();
        if items.len() < total {
            tracing::debug!(dropped = total - items.len(), "dropped items that could not be normalized");
        }
        items
    }

    /// Normalized page. `hasMore` defaults to "the page came back full".
    pub fn into_page(self, limit: u32) -> ReviewPage {
        let (has_more, total) = match &self {
            ListPayload::Bare(_) => (None, None),
            ListPayload::Envelope(envelope) => (
                envelope.has_more.as_ref().and_then(Value::as_bool),
                envelope.total.as_ref().and_then(as_count),
            ),
        };
        let items = self.into_items();
        let has_more = has_more.unwrap_or(items.len() == limit as usize);
        ReviewPage { items, has_more, total }
    }
}

/// Non-negative integer count from a JSON number or numeric string.
fn as_count(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then(|| n.round() as u64)
}

/// Aggregate envelope for `mode=meta`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaPayload {
    /// Payload version. Informational only, so any JSON value is accepted.
    #[serde(default)]
    pub v: Option<Value>,
    pub avg: f64,
    pub total: f64,
    #[serde(default)]
    pub buckets: serde_json::Map<String, Value>,
}

impl MetaPayload {
    pub fn decode(value: &Value) -> Result<Self, Error> {
        MetaPayload::deserialize(value)
            .map_err(|e| Error::InvalidResponse(format!("malformed summary: {}", e)))
    }

    pub fn validate(value: &Value) -> Result<(), Error> {
        Self::decode(value).map(drop)
    }

    pub fn into_summary(self) -> MetaSummary {
        let mut buckets = [0u64; 5];
        for (stars, slot) in (1..=5).zip(buckets.iter_mut()) {
            *slot = self.buckets.get(&stars.to_string()).and_then(as_count).unwrap_or(0);
        }
        let avg = if self.avg.is_finite() { self.avg } else { 0.0 };
        let total = if self.total.is_finite() && self.total > 0.0 { self.total.round() as u64 } else { 0 };
        MetaSummary { avg, total, buckets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_envelope() {
        let payload = ListPayload::decode(&json!({
            "v": 4,
            "items": [{ "estrelas": 5 }, { "estrelas": 4 }],
            "hasMore": true,
            "total": 12
        }))
        .unwrap();
        assert!(matches!(&payload, ListPayload::Envelope(e) if e.v == Some(json!(4))));

        let page = payload.into_page(2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.total, Some(12));
    }

    #[test]
    fn test_version_shape_does_not_reject_payload() {
        for v in [json!("4"), json!(4.0), json!(null)] {
            let payload = ListPayload::decode(&json!({ "v": v, "items": [{ "rating": 4 }] })).unwrap();
            assert_eq!(payload.into_items().len(), 1, "v = {v}");

            let summary = MetaPayload::decode(&json!({ "v": v, "avg": 4, "total": 1 })).unwrap().into_summary();
            assert_eq!(summary.total, 1, "v = {v}");
        }
    }

    #[test]
    fn test_decode_bare_array() {
        let payload = ListPayload::decode(&json!([{ "rating": 3 }, "junk", null])).unwrap();
        let items = payload.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].rating, 3.0);
    }

    #[test]
    fn test_unknown_shape_is_invalid_response() {
        for value in [json!({ "ok": false, "error": "boom" }), json!({ "items": "nope" }), json!("text"), json!(null)] {
            assert!(matches!(ListPayload::decode(&value), Err(Error::InvalidResponse(_))), "{value}");
        }
    }

    #[test]
    fn test_has_more_defaults_to_full_page() {
        let items = json!([{ "rating": 5 }, { "rating": 4 }, { "rating": 3 }]);

        let full = ListPayload::decode(&json!({ "items": items })).unwrap().into_page(3);
        assert!(full.has_more);
        assert!(full.total.is_none());

        let partial = ListPayload::decode(&json!({ "items": items })).unwrap().into_page(5);
        assert!(!partial.has_more);

        let explicit = ListPayload::decode(&json!({ "items": items, "hasMore": false })).unwrap().into_page(3);
        assert!(!explicit.has_more);
    }

    #[test]
    fn test_total_coercion() {
        assert_eq!(as_count(&json!(10)), Some(10));
        assert_eq!(as_count(&json!("7")), Some(7));
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_count(&json!(null)), None);
    }

    #[test]
    fn test_decode_meta() {
        let summary = MetaPayload::decode(&json!({
            "v": 4,
            "avg": 4.6,
            "total": 20,
            "buckets": { "1": 1, "2": 0, "3": 1, "4": 4, "5": 14 }
        }))
        .unwrap()
        .into_summary();

        assert_eq!(summary.total, 20);
        assert_eq!(summary.buckets, [1, 0, 1, 4, 14]);
        assert!((summary.avg - 4.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_meta_missing_buckets_count_zero() {
        let summary = MetaPayload::decode(&json!({ "avg": 5, "total": 2, "buckets": { "5": 2 } }))
            .unwrap()
            .into_summary();
        assert_eq!(summary.buckets, [0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_meta_requires_numbers() {
        assert!(MetaPayload::validate(&json!({ "total": 3 })).is_err());
        assert!(MetaPayload::validate(&json!({ "avg": "4.5", "total": 3 })).is_err());
        assert!(MetaPayload::validate(&json!([])).is_err());
    }
}
