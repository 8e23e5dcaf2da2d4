// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity provider trait for the external auth service.

use tokio::sync::watch;

use crate::types::Identity;

/// Source of the currently signed-in principal.
///
/// Verification happens in the auth service; this trait only reports the
/// result and its changes.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, if auth has settled on one.
    fn current_identity(&self) -> Option<Identity>;

    /// A receiver that observes every sign-in and sign-out.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}
