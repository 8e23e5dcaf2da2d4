// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level document CRUD.

use barangay_core::{BarangayError, Document, DocumentRecord, Precondition};
use rusqlite::{OptionalExtension, params};

use super::{decode, encode};
use crate::database::{Database, map_tr_err};
use crate::feed::{ChangeFeed, StoreChange};
use crate::records::merge_patch;

/// Result of a patch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    PreconditionFailed,
    Missing,
}

/// Insert a new document.
pub async fn insert_document(
    db: &Database,
    feed: &ChangeFeed,
    collection: &str,
    id: &str,
    data: Document,
    now: String,
) -> Result<(), BarangayError> {
    let (collection, id, feed) = (collection.to_string(), id.to_string(), feed.clone());
    db.connection()
        .call(move |conn| {
            let text = encode(&data)?;
            conn.execute(
                "INSERT INTO documents (collection, id, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data,
                     updated_at = excluded.updated_at",
                params![collection, id, text, now],
            )?;
            feed.publish(StoreChange::Document {
                collection,
                id,
                data: Some(data),
            });
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a document by id.
pub async fn get_document(
    db: &Database,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, BarangayError> {
    let (collection, id) = (collection.to_string(), id.to_string());
    db.connection()
        .call(move |conn| {
            let text: Option<String> = conn
                .query_row(
                    "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            text.map(|t| decode(&t, 0)).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Every document in a collection, by id.
pub async fn list_documents(
    db: &Database,
    collection: &str,
) -> Result<Vec<DocumentRecord>, BarangayError> {
    let collection = collection.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![collection], |row| {
                let id: String = row.get(0)?;
                let text: String = row.get(1)?;
                Ok((id, text))
            })?;
            let mut records = Vec::new();
            for row in rows {
                let (id, text) = row?;
                records.push(DocumentRecord::new(id, decode(&text, 1)?));
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge `patch` into a document inside one transaction, if every
/// precondition holds against the current row.
pub async fn patch_document(
    db: &Database,
    feed: &ChangeFeed,
    collection: &str,
    id: &str,
    preconditions: Vec<Precondition>,
    patch: Document,
    now: String,
) -> Result<PatchOutcome, BarangayError> {
    let (collection, id, feed) = (collection.to_string(), id.to_string(), feed.clone());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let text: Option<String> = tx
                .query_row(
                    "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(text) = text else {
                return Ok(PatchOutcome::Missing);
            };
            let mut doc = decode(&text, 0)?;
            if !preconditions.iter().all(|p| p.holds(&doc)) {
                return Ok(PatchOutcome::PreconditionFailed);
            }
            merge_patch(&mut doc, patch);
            tx.execute(
                "UPDATE documents SET data = ?3, updated_at = ?4
                 WHERE collection = ?1 AND id = ?2",
                params![collection, id, encode(&doc)?, now],
            )?;
            tx.commit()?;
            feed.publish(StoreChange::Document {
                collection,
                id,
                data: Some(doc),
            });
            Ok(PatchOutcome::Applied)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a document and every sub-collection entry under it.
pub async fn delete_document(
    db: &Database,
    feed: &ChangeFeed,
    collection: &str,
    id: &str,
) -> Result<(), BarangayError> {
    let (collection, id, feed) = (collection.to_string(), id.to_string(), feed.clone());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            tx.execute(
                "DELETE FROM subcollection_entries WHERE collection = ?1 AND parent_id = ?2",
                params![collection, id],
            )?;
            tx.commit()?;
            if removed > 0 {
                feed.publish(StoreChange::Document {
                    collection,
                    id,
                    data: None,
                });
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest `updated_at` across all documents.
pub async fn latest_write(db: &Database) -> Result<Option<String>, BarangayError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT MAX(updated_at) FROM documents", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn now() -> String {
        "2026-03-01T08:00:00.000000Z".to_string()
    }

    #[tokio::test]
    async fn insert_then_get() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = ChangeFeed::default();
        insert_document(&db, &feed, "conversations", "c1", doc(json!({"status": "bot"})), now())
            .await
            .unwrap();
        let got = get_document(&db, "conversations", "c1").await.unwrap().unwrap();
        assert_eq!(got.get("status"), Some(&json!("bot")));
        assert!(get_document(&db, "conversations", "c2").await.unwrap().is_none());
        assert!(get_document(&db, "staff", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_reports_each_outcome() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = ChangeFeed::default();
        insert_document(&db, &feed, "conversations", "c1", doc(json!({"status": "waiting"})), now())
            .await
            .unwrap();

        let guard = vec![Precondition::equals("status", "waiting")];
        let claim = doc(json!({"status": "active", "takenOverBy": "s1"}));
        let first = patch_document(&db, &feed, "conversations", "c1", guard.clone(), claim.clone(), now())
            .await
            .unwrap();
        let second = patch_document(&db, &feed, "conversations", "c1", guard.clone(), claim.clone(), now())
            .await
            .unwrap();
        let missing = patch_document(&db, &feed, "conversations", "zz", guard, claim, now())
            .await
            .unwrap();
        assert_eq!(first, PatchOutcome::Applied);
        assert_eq!(second, PatchOutcome::PreconditionFailed);
        assert_eq!(missing, PatchOutcome::Missing);
    }

    #[tokio::test]
    async fn latest_write_tracks_updates() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = ChangeFeed::default();
        assert_eq!(latest_write(&db).await.unwrap(), None);
        insert_document(&db, &feed, "c", "1", Document::new(), now()).await.unwrap();
        assert_eq!(latest_write(&db).await.unwrap(), Some(now()));
    }
}
