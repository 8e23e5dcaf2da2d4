// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical instant type and the single normalization point for stored timestamps.
//!
//! Stored documents carry timestamps in several historical shapes: RFC 3339
//! strings, `{seconds, nanoseconds}` objects (with or without leading
//! underscores), and bare epoch numbers in seconds or milliseconds. Everything
//! past the store boundary works with [`Timestamp`] only.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// The canonical instant used by all internal logic.
pub type Timestamp = DateTime<Utc>;

/// Epoch numbers above this are interpreted as milliseconds.
const MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

/// Normalize any stored timestamp shape into a [`Timestamp`].
///
/// Returns `None` for absent, null, or unparseable values.
pub fn normalize_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => parse_string(s),
        Value::Number(n) => n.as_f64().and_then(from_epoch_number),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok().filter(|n| *n < 1_000_000_000)?;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        _ => None,
    }
}

/// Encode a [`Timestamp`] in the canonical stored form.
///
/// Fixed-width microsecond RFC 3339 in UTC, so lexicographic order of the
/// stored strings matches chronological order.
pub fn timestamp_value(ts: Timestamp) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn parse_string(s: &str) -> Option<Timestamp> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    trimmed.parse::<f64>().ok().and_then(from_epoch_number)
}

fn from_epoch_number(n: f64) -> Option<Timestamp> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    let millis = if n >= MILLIS_THRESHOLD { n } else { n * 1000.0 };
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn rfc3339_string() {
        let ts = normalize_timestamp(&json!("2026-03-01T08:30:00Z")).unwrap();
        assert_eq!(ts, at(1_772_353_800));
    }

    #[test]
    fn offset_string_is_converted_to_utc() {
        let ts = normalize_timestamp(&json!("2026-03-01T16:30:00+08:00")).unwrap();
        assert_eq!(ts, at(1_772_353_800));
    }

    #[test]
    fn seconds_object_with_and_without_underscores() {
        let a = normalize_timestamp(&json!({"seconds": 1_772_353_800, "nanoseconds": 0})).unwrap();
        let b = normalize_timestamp(&json!({"_seconds": 1_772_353_800})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, at(1_772_353_800));
    }

    #[test]
    fn epoch_seconds_and_millis() {
        assert_eq!(normalize_timestamp(&json!(1_772_353_800)), Some(at(1_772_353_800)));
        assert_eq!(
            normalize_timestamp(&json!(1_772_353_800_000_i64)),
            Some(at(1_772_353_800))
        );
        assert_eq!(normalize_timestamp(&json!("1772353800")), Some(at(1_772_353_800)));
    }

    #[test]
    fn absent_or_garbage_is_none() {
        assert_eq!(normalize_timestamp(&Value::Null), None);
        assert_eq!(normalize_timestamp(&json!("")), None);
        assert_eq!(normalize_timestamp(&json!("yesterday")), None);
        assert_eq!(normalize_timestamp(&json!(true)), None);
        assert_eq!(normalize_timestamp(&json!({"nanoseconds": 5})), None);
    }

    #[test]
    fn canonical_form_reads_back() {
        let ts = at(1_772_353_800) + chrono::Duration::microseconds(42);
        assert_eq!(normalize_timestamp(&timestamp_value(ts)), Some(ts));
    }

    proptest! {
        #[test]
        fn canonical_strings_sort_chronologically(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
            let (ta, tb) = (at(a), at(b));
            let (sa, sb) = (timestamp_value(ta), timestamp_value(tb));
            prop_assert_eq!(sa.as_str().cmp(&sb.as_str()), ta.cmp(&tb));
        }
    }
}
