// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Controllable identity provider.

use barangay_core::{Identity, IdentityProvider};
use tokio::sync::watch;

/// An identity provider whose signed-in state is set by the test.
pub struct MockIdentity {
    tx: watch::Sender<Option<Identity>>,
}

impl MockIdentity {
    /// Start signed out.
    pub fn signed_out() -> Self {
        Self {
            tx: watch::channel(None).0,
        }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            tx: watch::channel(Some(identity)).0,
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl IdentityProvider for MockIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
