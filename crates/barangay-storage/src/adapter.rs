// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the DocumentStore trait.

use std::sync::Arc;

use async_trait::async_trait;
use barangay_config::model::StorageConfig;
use barangay_core::{
    AdapterType, BarangayError, Document, DocumentRecord, DocumentStore, HealthStatus,
    PluginAdapter, Precondition, Query, Subscription, SubscriptionTarget, Timestamp,
    normalize_timestamp, timestamp_value,
};
use serde_json::Value;
use tracing::debug;

use crate::clock::StoreClock;
use crate::database::{Database, map_tr_err};
use crate::feed::{ChangeFeed, SnapshotSource};
use crate::queries::documents::{self, PatchOutcome};
use crate::queries::subcollections;
use crate::records::{apply_query, new_id};

/// Reads snapshots for the forwarding tasks on a clone of the connection.
struct SqliteSnapshots {
    db: Database,
}

#[async_trait]
impl SnapshotSource for SqliteSnapshots {
    async fn snapshot(
        &self,
        target: &SubscriptionTarget,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        match target {
            SubscriptionTarget::Document { collection, id } => {
                Ok(documents::get_document(&self.db, collection, id)
                    .await?
                    .map(|d| vec![DocumentRecord::new(id.clone(), d)])
                    .unwrap_or_default())
            }
            SubscriptionTarget::Subcollection {
                collection,
                id,
                name,
            } => subcollections::list_entries(&self.db, collection, id, name).await,
            SubscriptionTarget::Query { collection, query } => Ok(apply_query(
                documents::list_documents(&self.db, collection).await?,
                query,
            )),
        }
    }
}

/// SQLite-backed document store.
///
/// Every call goes through the one tokio-rusqlite connection. Queries load
/// the collection and filter in process; the desk's collections are small.
pub struct SqliteStore {
    db: Database,
    feed: ChangeFeed,
    snapshots: Arc<SqliteSnapshots>,
    clock: StoreClock,
    subscription_buffer: usize,
}

impl SqliteStore {
    /// Open the database named by `config` and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BarangayError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Self::from_database(db).await
    }

    pub async fn open_in_memory() -> Result<Self, BarangayError> {
        Self::from_database(Database::open_in_memory().await?).await
    }

    async fn from_database(db: Database) -> Result<Self, BarangayError> {
        let floor = documents::latest_write(&db)
            .await?
            .and_then(|s| normalize_timestamp(&Value::String(s)));
        Ok(Self {
            snapshots: Arc::new(SqliteSnapshots { db: db.clone() }),
            db,
            feed: ChangeFeed::default(),
            clock: StoreClock::starting_after(floor),
            subscription_buffer: 64,
        })
    }

    pub fn with_subscription_buffer(mut self, buffer: usize) -> Self {
        self.subscription_buffer = buffer;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn write_stamp(&self) -> String {
        match timestamp_value(self.clock.now()) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        preconditions: Vec<Precondition>,
        patch: Document,
    ) -> Result<bool, BarangayError> {
        let stamp = self.write_stamp();
        match documents::patch_document(&self.db, &self.feed, collection, id, preconditions, patch, stamp)
            .await?
        {
            PatchOutcome::Applied => Ok(true),
            PatchOutcome::PreconditionFailed => Ok(false),
            PatchOutcome::Missing => Err(BarangayError::not_found(collection, id)),
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, BarangayError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BarangayError> {
        self.db.checkpoint().await?;
        debug!("sqlite store shut down");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_document(
        &self,
        collection: &str,
        data: Document,
    ) -> Result<String, BarangayError> {
        let id = new_id();
        documents::insert_document(&self.db, &self.feed, collection, &id, data, self.write_stamp())
            .await?;
        debug!(collection, id = %id, "document created");
        Ok(id)
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, BarangayError> {
        documents::get_document(&self.db, collection, id).await
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<(), BarangayError> {
        self.patch(collection, id, Vec::new(), patch).await.map(|_| ())
    }

    async fn update_fields_if(
        &self,
        collection: &str,
        id: &str,
        preconditions: &[Precondition],
        patch: Document,
    ) -> Result<bool, BarangayError> {
        self.patch(collection, id, preconditions.to_vec(), patch).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), BarangayError> {
        documents::delete_document(&self.db, &self.feed, collection, id).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        Ok(apply_query(
            documents::list_documents(&self.db, collection).await?,
            query,
        ))
    }

    async fn append_to_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
        data: Document,
    ) -> Result<String, BarangayError> {
        let record = DocumentRecord::new(new_id(), data);
        let entry_id = record.id.clone();
        if subcollections::append_entry(&self.db, &self.feed, collection, id, subcollection, record)
            .await?
        {
            Ok(entry_id)
        } else {
            Err(BarangayError::not_found(collection, id))
        }
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        id: &str,
        subcollection: &str,
    ) -> Result<Vec<DocumentRecord>, BarangayError> {
        subcollections::list_entries(&self.db, collection, id, subcollection).await
    }

    async fn subscribe(&self, target: SubscriptionTarget) -> Result<Subscription, BarangayError> {
        self.feed
            .subscribe(self.snapshots.clone(), target, self.subscription_buffer)
            .await
    }

    fn server_timestamp(&self) -> Timestamp {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barangay_config::model::StorageBackend;
    use barangay_core::{ChangeEvent, Filter};
    use serde_json::json;
    use tempfile::tempdir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Sqlite,
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Store);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("desk.db");
        let config = make_config(path.to_str().unwrap());

        let store = SqliteStore::open(&config).await.unwrap();
        let id = store
            .create_document("conversations", doc(json!({"residentId": "r1", "status": "bot"})))
            .await
            .unwrap();
        store
            .append_to_subcollection("conversations", &id, "messages", doc(json!({"message": "hello"})))
            .await
            .unwrap();
        let last_stamp = store.server_timestamp();
        store.shutdown().await.unwrap();
        drop(store);

        let reopened = SqliteStore::open(&config).await.unwrap();
        let got = reopened.get_document("conversations", &id).await.unwrap().unwrap();
        assert_eq!(got.get("status"), Some(&json!("bot")));
        let messages = reopened
            .list_subcollection("conversations", &id, "messages")
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(reopened.server_timestamp() > last_stamp - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn conditional_claim_has_one_winner() {
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let id = store
            .create_document("conversations", doc(json!({"status": "waiting"})))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for staff in ["s1", "s2", "s3", "s4"] {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_fields_if(
                        "conversations",
                        &id,
                        &[Precondition::equals("status", "waiting")],
                        doc(json!({"status": "active", "takenOverBy": staff})),
                    )
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn query_filters_and_null_deletes() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let a = store
            .create_document("conversations", doc(json!({"status": "active", "takenOverBy": "s1"})))
            .await
            .unwrap();
        store
            .create_document("conversations", doc(json!({"status": "resolved"})))
            .await
            .unwrap();
        store
            .update_fields("conversations", &a, doc(json!({"takenOverBy": null})))
            .await
            .unwrap();

        let unowned = store
            .query_documents(
                "conversations",
                &Query::new()
                    .filter(Filter::eq("status", "active"))
                    .filter(Filter::eq("takenOverBy", Value::Null)),
            )
            .await
            .unwrap();
        assert_eq!(unowned.len(), 1);
        assert_eq!(unowned[0].id, a);
    }

    #[tokio::test]
    async fn message_subscription_streams_appends() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = store.create_document("conversations", Document::new()).await.unwrap();
        store
            .append_to_subcollection("conversations", &id, "messages", doc(json!({"message": "first"})))
            .await
            .unwrap();

        let mut sub = store
            .subscribe(SubscriptionTarget::subcollection("conversations", &id, "messages"))
            .await
            .unwrap();
        assert!(matches!(sub.next().await, Some(ChangeEvent::Snapshot(r)) if r.len() == 1));

        store
            .append_to_subcollection("conversations", &id, "messages", doc(json!({"message": "second"})))
            .await
            .unwrap();
        assert!(matches!(
            sub.next().await,
            Some(ChangeEvent::Added(r)) if r.data["message"] == json!("second")
        ));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let err = store
            .update_fields("conversations", "ghost", Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BarangayError::NotFound { .. }));
    }
}
