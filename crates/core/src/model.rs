//! Canonical review records handed to UI collaborators.

use serde::{Deserialize, Serialize};

/// One review, whatever shape the backend stored it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    /// Coerced star rating. Always finite, not clamped; see [`NormalizedItem::stars`].
    pub rating: f64,
    /// ISO date when the source date could be understood, otherwise the raw string.
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Lower-cased platform tag, absent when the source had none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl NormalizedItem {
    /// Rating rounded and clamped into `0..=5` for star rendering.
    pub fn stars(&self) -> u8 {
        if !self.rating.is_finite() {
            return 0;
        }
        self.rating.round().clamp(0.0, 5.0) as u8
    }
}

/// One page of reviews plus pagination hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub items: Vec<NormalizedItem>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Aggregate rating summary for one platform (or all of them).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaSummary {
    pub avg: f64,
    pub total: u64,
    /// Counts for 1 through 5 stars, index 0 is one star.
    pub buckets: [u64; 5],
}

impl MetaSummary {
    /// Count of reviews with the given star value, 0 outside `1..=5`.
    pub fn bucket(&self, stars: u8) -> u64 {
        match stars {
            1..=5 => self.buckets[usize::from(stars - 1)],
            _ => 0,
        }
    }

    /// Share of reviews with `stars`, in `0.0..=1.0`.
    pub fn share(&self, stars: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.bucket(stars) as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(rating: f64) -> NormalizedItem {
        NormalizedItem {
            rating,
            date_iso: String::new(),
            author: String::new(),
            text: String::new(),
            url: None,
            photo_url: None,
            platform: None,
        }
    }

    #[test]
    fn test_stars_clamped() {
        assert_eq!(item(-3.0).stars(), 0);
        assert_eq!(item(0.0).stars(), 0);
        assert_eq!(item(4.6).stars(), 5);
        assert_eq!(item(4.4).stars(), 4);
        assert_eq!(item(12.0).stars(), 5);
        assert_eq!(item(f64::NAN).stars(), 0);
    }

    #[test]
    fn test_serialize_field_names() {
        let mut it = item(5.0);
        it.photo_url = Some("https://img.example.com/a.jpg".into());
        let json = serde_json::to_value(&it).unwrap();
        assert!(json.get("dateISO").is_some());
        assert!(json.get("photoURL").is_some());
        assert!(json.get("platform").is_none());
    }

    #[test]
    fn test_meta_buckets() {
        let meta = MetaSummary { avg: 4.5, total: 10, buckets: [0, 0, 1, 3, 6] };
        assert_eq!(meta.bucket(5), 6);
        assert_eq!(meta.bucket(0), 0);
        assert_eq!(meta.bucket(6), 0);
        assert!((meta.share(4) - 0.3).abs() < f64::EPSILON);

        let empty = MetaSummary { avg: 0.0, total: 0, buckets: [0; 5] };
        assert_eq!(empty.share(5), 0.0);
    }
}
