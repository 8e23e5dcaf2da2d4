// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document helpers shared by every adapter: merge patches, query
//! evaluation, and sub-collection ordering.

use std::cmp::Ordering;

use barangay_core::{Direction, Document, DocumentRecord, Query, normalize_timestamp};
use serde_json::Value;

/// Name of the ordering field on sub-collection entries.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Merge `patch` into `doc`. `null` values delete the field.
pub fn merge_patch(doc: &mut Document, patch: Document) {
    for (key, value) in patch {
        if value.is_null() {
            doc.remove(&key);
        } else {
            doc.insert(key, value);
        }
    }
}

/// A fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Filter, order, and limit `records` according to `query`.
pub fn apply_query(records: Vec<DocumentRecord>, query: &Query) -> Vec<DocumentRecord> {
    let mut matched: Vec<DocumentRecord> = records
        .into_iter()
        .filter(|r| query.matches(&r.data))
        .collect();

    if let Some((field, direction)) = &query.order_by {
        matched.sort_by(|a, b| {
            let ord = compare_values(
                a.data.get(field).unwrap_or(&Value::Null),
                b.data.get(field).unwrap_or(&Value::Null),
            );
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }

    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }
    matched
}

/// Total order over JSON values: null < bool < number < string < other.
///
/// Strings and objects that both parse as timestamps compare chronologically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(_) | Value::Object(_), Value::String(_) | Value::Object(_)) => {
            match (normalize_timestamp(a), normalize_timestamp(b)) {
                (Some(ta), Some(tb)) => ta.cmp(&tb),
                _ => match (a, b) {
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => rank(a).cmp(&rank(b)),
                },
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Stable sort of sub-collection entries by their normalized timestamp.
///
/// Entries without a readable timestamp sort after all stamped entries and
/// keep their insertion order.
pub fn sort_by_timestamp(entries: &mut [DocumentRecord]) {
    entries.sort_by(|a, b| {
        let ta = a.data.get(TIMESTAMP_FIELD).and_then(normalize_timestamp);
        let tb = b.data.get(TIMESTAMP_FIELD).and_then(normalize_timestamp);
        match (ta, tb) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Parse the JSON text of a stored document.
pub fn parse_document(text: &str) -> Result<Document, serde_json::Error> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Document::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barangay_core::Filter;
    use serde_json::json;

    fn rec(id: &str, value: Value) -> DocumentRecord {
        DocumentRecord::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn merge_patch_sets_and_deletes() {
        let mut doc = json!({"status": "active", "takenOverBy": "s1"})
            .as_object()
            .cloned()
            .unwrap();
        let patch = json!({"status": "resolved", "takenOverBy": null, "resolvedBy": "s1"})
            .as_object()
            .cloned()
            .unwrap();
        merge_patch(&mut doc, patch);
        assert_eq!(doc.get("status"), Some(&json!("resolved")));
        assert!(!doc.contains_key("takenOverBy"));
        assert_eq!(doc.get("resolvedBy"), Some(&json!("s1")));
    }

    #[test]
    fn query_orders_descending_and_limits() {
        let records = vec![
            rec("a", json!({"residentId": "r1", "createdAt": "2026-01-01T00:00:00.000000Z"})),
            rec("b", json!({"residentId": "r1", "createdAt": "2026-01-03T00:00:00.000000Z"})),
            rec("c", json!({"residentId": "r2", "createdAt": "2026-01-05T00:00:00.000000Z"})),
            rec("d", json!({"residentId": "r1", "createdAt": "2026-01-02T00:00:00.000000Z"})),
        ];
        let q = Query::new()
            .filter(Filter::eq("residentId", "r1"))
            .order_by("createdAt", Direction::Descending)
            .limit(2);
        let ids: Vec<String> = apply_query(records, &q).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn mixed_timestamp_shapes_compare_chronologically() {
        let a = json!({"seconds": 1_772_353_800});
        let b = json!("2026-03-01T08:31:00Z");
        assert_eq!(compare_values(&a, &b), Ordering::Less);
        assert_eq!(compare_values(&b, &a), Ordering::Greater);
    }

    #[test]
    fn unstamped_entries_sort_last_in_insertion_order() {
        let mut entries = vec![
            rec("x", json!({"message": "pending"})),
            rec("b", json!({"timestamp": "2026-01-01T00:00:02.000000Z"})),
            rec("y", json!({"message": "pending too"})),
            rec("a", json!({"timestamp": "2026-01-01T00:00:01.000000Z"})),
        ];
        sort_by_timestamp(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "x", "y"]);
    }
}
