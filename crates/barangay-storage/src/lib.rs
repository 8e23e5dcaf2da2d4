// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store adapters for the Barangay chat desk.
//!
//! [`MemoryStore`] keeps everything in process; [`SqliteStore`] persists to a
//! WAL-mode SQLite file with embedded migrations and a single-writer
//! connection via `tokio-rusqlite`. Both publish committed writes on a
//! [`ChangeFeed`] that drives live subscriptions.

pub mod adapter;
pub mod clock;
pub mod database;
pub mod feed;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod records;

use std::sync::Arc;

use barangay_config::model::{StorageBackend, StorageConfig};
use barangay_core::{BarangayError, DocumentStore};

pub use adapter::SqliteStore;
pub use clock::StoreClock;
pub use database::Database;
pub use feed::{ChangeFeed, SnapshotSource, StoreChange};
pub use memory::MemoryStore;

/// Build the store selected by `config.backend`.
pub async fn open_store(
    config: &StorageConfig,
    subscription_buffer: usize,
) -> Result<Arc<dyn DocumentStore>, BarangayError> {
    Ok(match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::with_subscription_buffer(subscription_buffer)),
        StorageBackend::Sqlite => Arc::new(
            SqliteStore::open(config)
                .await?
                .with_subscription_buffer(subscription_buffer),
        ),
    })
}
