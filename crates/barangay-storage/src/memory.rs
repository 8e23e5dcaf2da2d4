// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process document store.
//!
//! Holds everything behind one mutex; each write publishes its change while
//! the lock is held, so subscribers observe commits in order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use barangay_core::{
    AdapterType, BarangayError, Document, DocumentRecord, DocumentStore, HealthStatus,
    PluginAdapter, Precondition, Query, Subscription, SubscriptionTarget, Timestamp,
};
use tracing::debug;

use crate::clock::StoreClock;
use crate::feed::{ChangeFeed, SnapshotSource, StoreChange};
use crate::records::{apply_query, merge_patch, new_id, sort_by_timestamp};

type ChildKey = (String, String, String);

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, BTreeMap<String, Document>>,
    children: HashMap<ChildKey, Vec<DocumentRecord>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: Mutex<MemoryState>,
    feed: ChangeFeed,
}

impl MemoryInner {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SnapshotSource for MemoryInner {
    async fn snapshot(
        &self,
        target: &SubscriptionTarget,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        let state = self.lock();
        Ok(match target {
            SubscriptionTarget::Document { collection, id } => state
                .documents
                .get(collection)
                .and_then(|c| c.get(id))
                .map(|d| vec![DocumentRecord::new(id.clone(), d.clone())])
                .unwrap_or_default(),
            SubscriptionTarget::Subcollection {
                collection,
                id,
                name,
            } => {
                let key = (collection.clone(), id.clone(), name.clone());
                let mut entries = state.children.get(&key).cloned().unwrap_or_default();
                sort_by_timestamp(&mut entries);
                entries
            }
            SubscriptionTarget::Query { collection, query } => {
                apply_query(collect(&state, collection), query)
            }
        })
    }
}

fn collect(state: &MemoryState, collection: &str) -> Vec<DocumentRecord> {
    state
        .documents
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, d)| DocumentRecord::new(id.clone(), d.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Non-durable [`DocumentStore`] for tests, demos, and the `memory` backend.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
    clock: Arc<StoreClock>,
    subscription_buffer: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_subscription_buffer(64)
    }

    pub fn with_subscription_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner::default()),
            clock: Arc::new(StoreClock::new()),
            subscription_buffer: buffer,
        }
    }

    /// Insert or replace a document under a caller-chosen id.
    ///
    /// Used to seed directory collections and legacy-shaped fixtures.
    pub fn put_document(&self, collection: &str, id: &str, data: Document) {
        let mut state = self.inner.lock();
        state
            .documents
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data.clone());
        self.inner.feed.publish(StoreChange::Document {
            collection: collection.to_string(),
            id: id.to_string(),
            data: Some(data),
        });
    }

    fn patch_locked(
        &self,
        state: &mut MemoryState,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<(), BarangayError> {
        let doc = state
            .documents
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| BarangayError::not_found(collection, id))?;
        merge_patch(doc, patch);
        self.inner.feed.publish(StoreChange::Document {
            collection: collection.to_string(),
            id: id.to_string(),
            data: Some(doc.clone()),
        });
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, BarangayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BarangayError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        collection: &str,
        data: Document,
    ) -> Result<String, BarangayError> {
        let id = new_id();
        self.put_document(collection, &id, data);
        debug!(collection, id = %id, "document created");
        Ok(id)
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BarangayError> {
        let state = self.inner.lock();
        Ok(state.documents.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<(), BarangayError> {
        let mut state = self.inner.lock();
        self.patch_locked(&mut state, collection, id, patch)
    }

    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        preconditions: &[Precondition],
        patch: Document,
    ) -> Result<bool, BarangayError> {
        let mut state = self.inner.lock();
        let current = state
            .documents
            .get(collection)
            .and_then(|c| c.get(id))
            .ok_or_else(|| BarangayError::not_found(collection, id))?;
        if !preconditions.iter().all(|p| p.holds(current)) {
            return Ok(false);
        }
        self.patch_locked(&mut state, collection, id, patch)?;
        Ok(true)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BarangayError> {
        let mut state = self.inner.lock();
        let removed = state
            .documents
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();
        state
            .children
            .retain(|(c, parent, _), _| !(c == collection && parent == id));
        if removed {
            self.inner.feed.publish(StoreChange::Document {
                collection: collection.to_string(),
                id: id.to_string(),
                data: None,
            });
        }
        Ok(())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        let state = self.inner.lock();
        Ok(apply_query(collect(&state, collection), query))
    }

    async fn append_to_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        data: Document,
    ) -> Result<String, BarangayError> {
        let mut state = self.inner.lock();
        let parent_exists = state
            .documents
            .get(collection)
            .is_some_and(|c| c.contains_key(id));
        if !parent_exists {
            return Err(BarangayError::not_found(collection, id));
        }
        let record = DocumentRecord::new(new_id(), data);
        state
            .children
            .entry((collection.to_string(), id.to_string(), subcollection.to_string()))
            .or_default()
            .push(record.clone());
        let entry_id = record.id.clone();
        self.inner.feed.publish(StoreChange::Child {
            collection: collection.to_string(),
            parent_id: id.to_string(),
            name: subcollection.to_string(),
            record,
        });
        Ok(entry_id)
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        self.inner
            .snapshot(&SubscriptionTarget::subcollection(collection, id, subcollection))
            .await
    }

    async fn subscribe(&self, target: SubscriptionTarget) -> Result<Subscription, BarangayError> {
        self.inner
            .feed
            .subscribe(self.inner.clone(), target, self.subscription_buffer)
            .await
    }

    fn server_timestamp(&self) -> Timestamp {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barangay_core::{ChangeEvent, Filter, timestamp_value};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = MemoryStore::new();
        let id = store
            .create_document("conversations", doc(json!({"status": "bot"})))
            .await
            .unwrap();
        store
            .update_fields("conversations", &id, doc(json!({"status": "waiting"})))
            .await
            .unwrap();
        let got = store.get_document("conversations", &id).await.unwrap().unwrap();
        assert_eq!(got.get("status"), Some(&json!("waiting")));

        store.delete_document("conversations", &id).await.unwrap();
        assert!(store.get_document("conversations", &id).await.unwrap().is_none());
        // Deleting again is a no-op.
        store.delete_document("conversations", &id).await.unwrap();
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_fields("conversations", "nope", Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BarangayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_precondition() {
        let store = MemoryStore::new();
        let id = store
            .create_document("conversations", doc(json!({"status": "waiting"})))
            .await
            .unwrap();
        let guard = [Precondition::equals("status", "waiting")];
        let first = store
            .update_fields_if("conversations", &id, &guard, doc(json!({"status": "active", "takenOverBy": "s1"})))
            .await
            .unwrap();
        let second = store
            .update_fields_if("conversations", &id, &guard, doc(json!({"status": "active", "takenOverBy": "s2"})))
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        let got = store.get_document("conversations", &id).await.unwrap().unwrap();
        assert_eq!(got.get("takenOverBy"), Some(&json!("s1")));
    }

    #[tokio::test]
    async fn subcollection_lists_in_timestamp_order() {
        let store = MemoryStore::new();
        let id = store.create_document("conversations", Document::new()).await.unwrap();
        let late = store.server_timestamp();
        let early = late - chrono::Duration::seconds(5);
        store
            .append_to_subcollection("conversations", &id, "messages", doc(json!({"message": "late", "timestamp": timestamp_value(late)})))
            .await
            .unwrap();
        store
            .append_to_subcollection("conversations", &id, "messages", doc(json!({"message": "early", "timestamp": timestamp_value(early)})))
            .await
            .unwrap();
        let texts: Vec<_> = store
            .list_subcollection("conversations", &id, "messages")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.data["message"].clone())
            .collect();
        assert_eq!(texts, vec![json!("early"), json!("late")]);
    }

    #[tokio::test]
    async fn append_to_missing_parent_fails() {
        let store = MemoryStore::new();
        let err = store
            .append_to_subcollection("conversations", "gone", "messages", Document::new())
            .await
            .unwrap_err();
        assert!(err.requires_refresh());
    }

    #[tokio::test]
    async fn query_subscription_sees_new_matches() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe(SubscriptionTarget::query(
                "conversations",
                Query::new().filter(Filter::eq("status", "waiting")),
            ))
            .await
            .unwrap();
        assert_eq!(sub.next().await, Some(ChangeEvent::Snapshot(vec![])));

        let id = store
            .create_document("conversations", doc(json!({"status": "waiting"})))
            .await
            .unwrap();
        assert!(matches!(sub.next().await, Some(ChangeEvent::Added(r)) if r.id == id));
    }

    #[tokio::test]
    async fn delete_clears_subcollection() {
        let store = MemoryStore::new();
        let id = store.create_document("conversations", Document::new()).await.unwrap();
        store
            .append_to_subcollection("conversations", &id, "messages", Document::new())
            .await
            .unwrap();
        store.delete_document("conversations", &id).await.unwrap();
        store.put_document("conversations", &id, Document::new());
        assert!(store
            .list_subcollection("conversations", &id, "messages")
            .await
            .unwrap()
            .is_empty());
    }
}
