//! Item normalization.
//!
//! The spreadsheet backend has gone through several column layouts, so one
//! logical field can arrive under different names. Each field is resolved
//! through an ordered alias list; the first usable value wins.

pub mod date;

pub use date::{normalize_date, normalize_date_value};

use serde_json::{Map, Value};

use feedback_core::NormalizedItem;

const RATING_KEYS: &[&str] = &["estrelas", "rating", "stars", "nota", "score"];
const DATE_KEYS: &[&str] = &["data", "date", "createdAt", "created_at", "timestamp"];
const AUTHOR_KEYS: &[&str] = &["autor", "author", "nome", "name"];
const TEXT_KEYS: &[&str] = &["texto", "text", "comentario", "comment", "review"];
const URL_KEYS: &[&str] = &["url", "link", "href"];
const PHOTO_KEYS: &[&str] = &[
    "photoURL", "photoUrl", "photo_url", "foto", "fotoUrl", "photo", "imagem", "image", "img", "avatar",
];
const PLATFORM_KEYS: &[&str] = &["plataforma", "platform", "plat", "origem", "source"];

/// Convert one raw backend item into a [`NormalizedItem`].
///
/// Returns `None` when `raw` is not a JSON object. Never fails otherwise:
/// missing fields become empty strings or `None`, bad ratings become 0.
pub fn normalize(raw: &Value) -> Option<NormalizedItem> {
    let obj = raw.as_object()?;

    Some(NormalizedItem {
        rating: first_present(obj, RATING_KEYS).map(coerce_rating).unwrap_or(0.0),
        date_iso: normalize_date_value(first_present(obj, DATE_KEYS)),
        author: first_text(obj, AUTHOR_KEYS).unwrap_or_default(),
        text: first_text(obj, TEXT_KEYS).unwrap_or_default(),
        url: first_text(obj, URL_KEYS),
        photo_url: first_photo(obj),
        platform: first_text(obj, PLATFORM_KEYS).map(|p| p.to_lowercase()),
    })
}

/// Numeric coercion of a rating value. Always finite, 0 when unusable.
///
/// Accepts numbers and numeric strings (with `,` or `.` decimals); any
/// other type counts as 0.
pub fn coerce_rating(value: &Value) -> f64 {
    let rating = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if rating.is_finite() { rating } else { 0.0 }
}

/// First alias that is present with a non-null, non-blank value.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// First alias holding non-empty text, trimmed. Numbers are stringified.
fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(as_text)
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn first_photo(obj: &Map<String, Value>) -> Option<String> {
    PHOTO_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(as_text)
        .find(|candidate| is_plausible_photo_url(candidate))
}

/// Whether `candidate` looks like something an `<img>` could load.
pub fn is_plausible_photo_url(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    if lower.contains(char::is_whitespace) {
        return false;
    }
    ["http://", "https://", "//", "data:image/"].iter().any(|prefix| lower.starts_with(prefix))
        && lower.len() > "https://".len()
}
