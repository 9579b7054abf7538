//! Review date normalization.
//!
//! Dates arrive as ISO strings, `DD/MM/YYYY` spreadsheet cells, assorted
//! human formats, or epoch milliseconds. Whatever cannot be understood is
//! passed through untouched.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;

static ISO_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"));

static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Normalize any JSON date value. Missing or null dates become `""`.
pub fn normalize_date_value(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => normalize_date(s),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| n.to_string()),
        _ => String::new(),
    }
}

/// Normalize a date string to ISO form, or return it unchanged.
///
/// - `YYYY-MM-DD...` is kept as is
/// - `DD/MM/YYYY` becomes `YYYY-MM-DD`
/// - other recognizable dates become `YYYY-MM-DD`, datetimes RFC 3339 in UTC
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if ISO_PREFIX.is_match(trimmed) {
        return trimmed.to_string();
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(trimmed) {
        let day = caps[1].parse().ok();
        let month = caps[2].parse().ok();
        let year = caps[3].parse().ok();
        return match (year, month, day) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| raw.to_string()),
            _ => raw.to_string(),
        };
    }

    parse_generic(trimmed).unwrap_or_else(|| raw.to_string())
}

fn parse_generic(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}
