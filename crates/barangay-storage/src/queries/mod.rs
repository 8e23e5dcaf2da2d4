// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL operations behind [`SqliteStore`](crate::SqliteStore).
//!
//! Writes take the [`ChangeFeed`](crate::ChangeFeed) and publish from inside
//! the connection closure, after commit, so feed order equals commit order.

pub mod documents;
pub mod subcollections;

use barangay_core::Document;
use rusqlite::types::Type;

use crate::records::parse_document;

fn encode(doc: &Document) -> rusqlite::Result<String> {
    serde_json::to_string(doc).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode(text: &str, column: usize) -> rusqlite::Result<Document> {
    parse_document(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
