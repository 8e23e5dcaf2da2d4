// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff and resident directories backed by the document store.

use std::sync::Arc;

use async_trait::async_trait;
use barangay_core::{
    BarangayError, Document, DocumentStore, ResidentDirectory, ResidentProfile, StaffDirectory,
    StaffMember, StaffRole,
};
use serde_json::Value;

use crate::records::{RESIDENTS, STAFF, fields};

fn text(doc: &Document, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads `staff/{uid}` documents of the shape `{displayName, role}`.
///
/// A missing document means the uid is not staff. An unrecognized role
/// reads as plain staff.
pub struct StoreStaffDirectory {
    store: Arc<dyn DocumentStore>,
}

impl StoreStaffDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StaffDirectory for StoreStaffDirectory {
    async fn staff_member(&self, uid: &str) -> Result<Option<StaffMember>, BarangayError> {
        let Some(doc) = self.store.get_document(STAFF, uid).await? else {
            return Ok(None);
        };
        let role = match text(&doc, fields::ROLE).as_deref() {
            Some(r) if r.eq_ignore_ascii_case("admin") => StaffRole::Admin,
            _ => StaffRole::Staff,
        };
        Ok(Some(StaffMember {
            uid: uid.to_string(),
            display_name: text(&doc, fields::DISPLAY_NAME).unwrap_or_else(|| uid.to_string()),
            role,
        }))
    }
}

/// Reads `residents/{uid}` profiles of the shape `{firstName, lastName}`.
pub struct StoreResidentDirectory {
    store: Arc<dyn DocumentStore>,
}

impl StoreResidentDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResidentDirectory for StoreResidentDirectory {
    async fn profile(&self, uid: &str) -> Result<Option<ResidentProfile>, BarangayError> {
        Ok(self
            .store
            .get_document(RESIDENTS, uid)
            .await?
            .map(|doc| ResidentProfile {
                first_name: text(&doc, fields::FIRST_NAME),
                last_name: text(&doc, fields::LAST_NAME),
            }))
    }
}
