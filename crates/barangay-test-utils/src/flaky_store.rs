// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A document store wrapper that fails on demand.
//!
//! `FlakyStore` delegates to an inner store until told to fail, then returns
//! a storage error from the next N writes (or reads). It can also commit a
//! foreign write just before the next conditional update, which is how a
//! competing client lands between a read and its compare-and-swap.
//! Subscriptions and the clock always pass through.

use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use barangay_core::{
    AdapterType, BarangayError, Document, DocumentRecord, DocumentStore, HealthStatus,
    PluginAdapter, Precondition, Query, Subscription, SubscriptionTarget, Timestamp,
};

pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    failing_writes: AtomicUsize,
    failing_reads: AtomicUsize,
    interleaved: Mutex<Option<InterleavedWrite>>,
}

struct InterleavedWrite {
    collection: String,
    id: String,
    patch: Document,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            failing_writes: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
            interleaved: Mutex::new(None),
        }
    }

    /// Fail the next `n` write operations.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` read operations.
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Apply `patch` to `collection/id` right before the next
    /// `update_fields_if`, as if another client had committed it first.
    pub fn write_before_next_swap(&self, collection: &str, id: &str, patch: Document) {
        *self.interleaved.lock().unwrap_or_else(PoisonError::into_inner) = Some(InterleavedWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        });
    }

    fn trip(counter: &AtomicUsize, op: &str) -> Result<(), BarangayError> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(BarangayError::storage(format!("injected failure in {op}")))
        } else {
            Ok(())
        }
    }

    fn write(&self, op: &str) -> Result<(), BarangayError> {
        Self::trip(&self.failing_writes, op)
    }

    fn read(&self, op: &str) -> Result<(), BarangayError> {
        Self::trip(&self.failing_reads, op)
    }
}

#[async_trait]
impl PluginAdapter for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, BarangayError> {
        if self.failing_writes.load(Ordering::SeqCst) > 0 {
            return Ok(HealthStatus::Degraded("injecting write failures".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), BarangayError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create_document(&self, collection: &str, data: Document) -> Result<String, BarangayError> {
        self.write("create_document")?;
        self.inner.create_document(collection, data).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, BarangayError> {
        self.read("get_document")?;
        self.inner.get_document(collection, id).await
    }

    async fn update_fields(&self, collection: &str, id: &str, patch: Document) -> Result<(), BarangayError> {
        self.write("update_fields")?;
        self.inner.update_fields(collection, id, patch).await
    }

    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        preconditions: &[Precondition],
        patch: Document,
    ) -> Result<bool, BarangayError> {
        self.write("update_fields_if")?;
        let interleaved = self
            .interleaved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(w) = interleaved {
            self.inner.update_fields(&w.collection, &w.id, w.patch).await?;
        }
        self.inner
            .update_fields_if(collection, id, preconditions, patch)
            .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BarangayError> {
        self.write("delete_document")?;
        self.inner.delete_document(collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        self.read("query_documents")?;
        self.inner.query_documents(collection, query).await
    }

    async fn append_to_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        data: Document,
    ) -> Result<String, BarangayError> {
        self.write("append_to_subcollection")?;
        self.inner
            .append_to_subcollection(collection, id, subcollection, data)
            .await
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        self.read("list_subcollection")?;
        self.inner.list_subcollection(collection, id, subcollection).await
    }

    async fn subscribe(&self, target: SubscriptionTarget) -> Result<Subscription, BarangayError> {
        self.inner.subscribe(target).await
    }

    fn server_timestamp(&self) -> Timestamp {
        self.inner.server_timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barangay_storage::MemoryStore;

    #[tokio::test]
    async fn fails_exactly_n_writes() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.fail_next_writes(1);
        assert!(store.create_document("c", Document::new()).await.is_err());
        let id = store.create_document("c", Document::new()).await.unwrap();
        assert!(store.get_document("c", &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn interleaved_write_lands_before_the_swap() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        let mut doc = Document::new();
        doc.insert("owner".into(), "a".into());
        let id = store.create_document("c", doc).await.unwrap();

        let mut theirs = Document::new();
        theirs.insert("owner".into(), "b".into());
        store.write_before_next_swap("c", &id, theirs);

        let mut ours = Document::new();
        ours.insert("done".into(), true.into());
        let applied = store
            .update_fields_if("c", &id, &[Precondition::equals("owner", "a")], ours.clone())
            .await
            .unwrap();
        assert!(!applied);
        // One-shot: the next swap sees no interference.
        let applied = store
            .update_fields_if("c", &id, &[Precondition::equals("owner", "b")], ours)
            .await
            .unwrap();
        assert!(applied);
    }

    #[tokio::test]
    async fn read_failures_are_transient() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.fail_next_reads(1);
        let err = store.get_document("c", "x").await.unwrap_err();
        assert!(err.is_transient());
    }
}
