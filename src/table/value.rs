//! Coercion of opaque JSON cell values into sortable and displayable forms.
//!
//! Rows arrive from the API as loosely typed JSON. Every coercion here is
//! total: missing, null or unparseable input maps to the type's minimum
//! (`0`, `false`, epoch 0, empty string) instead of failing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;

/// Coerce a cell to a finite float. Numeric strings are parsed; anything
/// else is `0.0`.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Coerce a cell to a boolean.
///
/// `true`, non-zero numbers and the strings `1`, `true`, `si`, `sí`, `s`,
/// `y`, `yes` are truthy. Null and missing values are `false`.
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "si" | "sí" | "s" | "y" | "yes"
        ),
        _ => false,
    }
}

/// Coerce a cell to milliseconds since the Unix epoch.
///
/// Numbers are taken as epoch milliseconds. Strings may be RFC 3339
/// (`2024-03-01T10:00:00Z`), `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` or
/// `DD/MM/YYYY`, optionally followed by a time of day.
pub fn coerce_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => parse_timestamp_millis(s).unwrap_or(0),
        _ => 0,
    }
}

/// Coerce a cell holding a time of day (`HH:MM` or `HH:MM:SS`) to seconds.
pub fn coerce_time(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::String(s)) => parse_time_of_day(s).unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32).unwrap_or(0),
        _ => 0,
    }
}

/// Render a cell as plain text without type-specific formatting.
pub fn to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Lowercase and strip common Spanish/Catalan diacritics so that text
/// comparison approximates locale-aware ordering.
pub fn fold_text(text: &str) -> String {
    text.chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Date-time layouts accepted after RFC 3339, tried in order.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse a date or date-time string.
///
/// Offsets in RFC 3339 input are kept; naive values are taken as UTC.
/// Impossible calendar dates are rejected.
pub fn parse_date_time(input: &str) -> Option<DateTime<FixedOffset>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|dt| dt.and_utc().fixed_offset())
}

/// Parse a date or date-time string to epoch milliseconds.
pub fn parse_timestamp_millis(input: &str) -> Option<i64> {
    parse_date_time(input).map(|dt| dt.timestamp_millis())
}

/// Parse a time of day (`HH:MM` or `HH:MM:SS`).
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let s = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
}

/// Parse `HH:MM` or `HH:MM:SS` to seconds since midnight.
pub fn parse_time_of_day(input: &str) -> Option<u32> {
    parse_time(input).map(|time| time.num_seconds_from_midnight())
}
