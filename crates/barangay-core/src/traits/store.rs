// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store adapter trait.

use async_trait::async_trait;

use crate::document::{Document, DocumentRecord, Precondition, Query, SubscriptionTarget};
use crate::error::BarangayError;
use crate::subscription::Subscription;
use crate::timestamp::Timestamp;
use crate::traits::adapter::PluginAdapter;

/// A document database with per-document records, append-only ordered
/// sub-collections, filtered queries, and live subscriptions.
///
/// Writes are last-write-wins unless guarded with [`update_fields_if`].
/// No operation spans more than one top-level document.
///
/// [`update_fields_if`]: DocumentStore::update_fields_if
#[async_trait]
pub trait DocumentStore: PluginAdapter {
    /// Create a document and return its new id.
    async fn create_document(&self, collection: &str, data: Document)
    -> Result<String, BarangayError>;

    /// Point read. `Ok(None)` when the document does not exist.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BarangayError>;

    /// Merge `patch` into the document. A `null` value deletes the field.
    ///
    /// Fails with [`BarangayError::NotFound`] if the document is missing.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<(), BarangayError>;

    /// Merge `patch` only if every precondition holds at write time.
    ///
    /// Returns `Ok(false)` without writing when a precondition fails.
    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        preconditions: &[Precondition],
        patch: Document,
    ) -> Result<bool, BarangayError>;

    /// Delete a document and its sub-collections. Deleting a missing document is a no-op.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BarangayError>;

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<DocumentRecord>, BarangayError>;

    /// Append an entry to a document's sub-collection and return its id.
    async fn append_to_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        data: Document,
    ) -> Result<String, BarangayError>;

    /// All entries of a sub-collection, ascending by their `timestamp` field.
    async fn list_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<DocumentRecord>, BarangayError>;

    /// Open a live subscription. The first event is always a snapshot.
    async fn subscribe(&self, target: SubscriptionTarget) -> Result<Subscription, BarangayError>;

    /// A store-assigned instant, strictly greater than any previously returned.
    fn server_timestamp(&self) -> Timestamp;
}
