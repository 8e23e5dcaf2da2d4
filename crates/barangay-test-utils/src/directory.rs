// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory staff and resident directories.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use barangay_core::{
    BarangayError, ResidentDirectory, ResidentProfile, StaffDirectory, StaffMember, StaffRole,
};

/// Staff directory populated by the test.
#[derive(Default)]
pub struct MockStaffDirectory {
    members: Mutex<HashMap<String, StaffMember>>,
}

impl MockStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, uid: &str, display_name: &str, role: StaffRole) {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                uid.to_string(),
                StaffMember {
                    uid: uid.to_string(),
                    display_name: display_name.to_string(),
                    role,
                },
            );
    }

    pub fn remove(&self, uid: &str) {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uid);
    }
}

#[async_trait]
impl StaffDirectory for MockStaffDirectory {
    async fn staff_member(&self, uid: &str) -> Result<Option<StaffMember>, BarangayError> {
        Ok(self
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uid)
            .cloned())
    }
}

/// Resident profiles populated by the test.
#[derive(Default)]
pub struct MockResidentDirectory {
    profiles: Mutex<HashMap<String, ResidentProfile>>,
}

impl MockResidentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, uid: &str, first_name: &str, last_name: &str) {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                uid.to_string(),
                ResidentProfile {
                    first_name: Some(first_name.to_string()),
                    last_name: Some(last_name.to_string()),
                },
            );
    }
}

#[async_trait]
impl ResidentDirectory for MockResidentDirectory {
    async fn profile(&self, uid: &str) -> Result<Option<ResidentProfile>, BarangayError> {
        Ok(self
            .profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uid)
            .cloned())
    }
}
