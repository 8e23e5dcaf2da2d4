// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only sub-collection entries.

use barangay_core::{BarangayError, Document, DocumentRecord};
use rusqlite::params;

use super::{decode, encode};
use crate::database::{Database, map_tr_err};
use crate::feed::{ChangeFeed, StoreChange};
use crate::records::sort_by_timestamp;

/// Append an entry. Returns `false` when the parent document does not exist.
pub async fn append_entry(
    db: &Database,
    feed: &ChangeFeed,
    collection: &str,
    parent_id: &str,
    name: &str,
    record: DocumentRecord,
) -> Result<bool, BarangayError> {
    let (collection, parent_id, name, feed) = (
        collection.to_string(),
        parent_id.to_string(),
        name.to_string(),
        feed.clone(),
    );
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let parent: i64 = tx.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, parent_id],
                |row| row.get(0),
            )?;
            if parent == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO subcollection_entries (collection, parent_id, name, id, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![collection, parent_id, name, record.id, encode(&record.data)?],
            )?;
            tx.commit()?;
            feed.publish(StoreChange::Child {
                collection,
                parent_id,
                name,
                record,
            });
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// All entries under a parent, ascending by `timestamp` then insertion order.
pub async fn list_entries(
    db: &Database,
    collection: &str,
    parent_id: &str,
    name: &str,
) -> Result<Vec<DocumentRecord>, BarangayError> {
    let (collection, parent_id, name) =
        (collection.to_string(), parent_id.to_string(), name.to_string());
    let mut entries = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, data FROM subcollection_entries
                 WHERE collection = ?1 AND parent_id = ?2 AND name = ?3
                 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![collection, parent_id, name], |row| {
                let id: String = row.get(0)?;
                let text: String = row.get(1)?;
                Ok((id, text))
            })?;
            let mut entries = Vec::new();
            for row in rows {
                let (id, text) = row?;
                entries.push(DocumentRecord::new(id, decode(&text, 1)?));
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)?;
    sort_by_timestamp(&mut entries);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::documents::insert_document;
    use serde_json::json;

    #[tokio::test]
    async fn append_requires_parent() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = ChangeFeed::default();
        let entry = DocumentRecord::new("m1", Document::new());
        assert!(!append_entry(&db, &feed, "conversations", "c1", "messages", entry.clone())
            .await
            .unwrap());

        insert_document(&db, &feed, "conversations", "c1", Document::new(), "t".into())
            .await
            .unwrap();
        assert!(append_entry(&db, &feed, "conversations", "c1", "messages", entry)
            .await
            .unwrap());
        let listed = list_entries(&db, "conversations", "c1", "messages").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "m1");
    }

    #[tokio::test]
    async fn entries_are_scoped_to_their_parent() {
        let db = Database::open_in_memory().await.unwrap();
        let feed = ChangeFeed::default();
        for parent in ["a", "b"] {
            insert_document(&db, &feed, "conversations", parent, Document::new(), "t".into())
                .await
                .unwrap();
        }
        let data = json!({"message": "hi"}).as_object().cloned().unwrap();
        append_entry(&db, &feed, "conversations", "a", "messages", DocumentRecord::new("m1", data))
            .await
            .unwrap();
        assert!(list_entries(&db, "conversations", "b", "messages").await.unwrap().is_empty());
    }
}
