// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic document model shared by every store adapter.
//!
//! Documents are schemaless JSON objects. Typed conversion happens in the
//! chat crate's record layer; nothing here knows about conversations.

use serde_json::Value;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// A document together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub data: Document,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Field equals the value. `Null` matches an absent field.
    Eq(Value),
    /// Field equals any of the values.
    In(Vec<Value>),
}

/// A single field predicate in a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq(value.into()),
        }
    }

    pub fn one_of<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        let actual = doc.get(&self.field).unwrap_or(&Value::Null);
        match &self.op {
            FilterOp::Eq(expected) => actual == expected,
            FilterOp::In(options) => options.iter().any(|o| o == actual),
        }
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A filtered, ordered, limited collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when the document satisfies every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

/// A compare-and-swap guard for [`DocumentStore::update_fields_if`](crate::DocumentStore::update_fields_if).
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub field: String,
    /// Expected current value. `Null` means the field must be absent.
    pub expected: Value,
}

impl Precondition {
    pub fn equals(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn absent(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: Value::Null,
        }
    }

    pub fn holds(&self, doc: &Document) -> bool {
        doc.get(&self.field).unwrap_or(&Value::Null) == &self.expected
    }
}

/// What a live subscription observes.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionTarget {
    /// A single document.
    Document { collection: String, id: String },
    /// The ordered sub-collection of a document.
    Subcollection {
        collection: String,
        id: String,
        name: String,
    },
    /// Every document in a collection matching a query.
    Query { collection: String, query: Query },
}

impl SubscriptionTarget {
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        SubscriptionTarget::Document {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn subcollection(
        collection: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        SubscriptionTarget::Subcollection {
            collection: collection.into(),
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn query(collection: impl Into<String>, query: Query) -> Self {
        SubscriptionTarget::Query {
            collection: collection.into(),
            query,
        }
    }
}

/// A change pushed by a live subscription.
///
/// The first event of every subscription is a [`ChangeEvent::Snapshot`] of
/// the current state. Delivery is at-least-once: later events may repeat
/// items already seen, and a fresh snapshot may be sent to resynchronize.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Snapshot(Vec<DocumentRecord>),
    Added(DocumentRecord),
    Modified(DocumentRecord),
    Removed { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_filter_null_matches_absent_field() {
        let d = doc(json!({"status": "bot"}));
        assert!(Filter::eq("takenOverBy", Value::Null).matches(&d));
        assert!(!Filter::eq("status", "waiting").matches(&d));
    }

    #[test]
    fn in_filter_matches_any() {
        let d = doc(json!({"status": "waiting"}));
        assert!(Filter::one_of("status", ["bot", "waiting", "active"]).matches(&d));
        assert!(!Filter::one_of("status", ["resolved", "closed"]).matches(&d));
    }

    #[test]
    fn query_requires_all_filters() {
        let d = doc(json!({"residentId": "r1", "status": "active"}));
        let q = Query::new()
            .filter(Filter::eq("residentId", "r1"))
            .filter(Filter::eq("status", "waiting"));
        assert!(!q.matches(&d));
        assert!(Query::new().matches(&d));
    }

    #[test]
    fn precondition_absent_and_equals() {
        let d = doc(json!({"status": "waiting"}));
        assert!(Precondition::equals("status", "waiting").holds(&d));
        assert!(Precondition::absent("takenOverBy").holds(&d));
        assert!(!Precondition::absent("status").holds(&d));
    }
}
