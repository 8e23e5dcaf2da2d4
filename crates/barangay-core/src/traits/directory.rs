// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory lookups for staff roles and resident profiles.

use async_trait::async_trait;

use crate::error::BarangayError;
use crate::types::{ResidentProfile, StaffMember, StaffRole};

/// Staff membership lookups.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// The directory entry for `uid`, or `None` if `uid` is not staff.
    async fn staff_member(&self, uid: &str) -> Result<Option<StaffMember>, BarangayError>;

    async fn role_of(&self, uid: &str) -> Result<Option<StaffRole>, BarangayError> {
        Ok(self.staff_member(uid).await?.map(|m| m.role))
    }
}

/// Resident profile lookups.
#[async_trait]
pub trait ResidentDirectory: Send + Sync {
    async fn profile(&self, uid: &str) -> Result<Option<ResidentProfile>, BarangayError>;
}
