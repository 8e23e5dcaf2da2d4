// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellable live subscriptions.
//!
//! A [`Subscription`] is the receiving half of a bounded channel of
//! [`ChangeEvent`]s plus a [`CancellationToken`] shared with whatever task
//! feeds it. Unsubscribing (explicitly or by dropping) cancels the token, so
//! the feeding task stops and no callback can fire against a stale view.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::document::ChangeEvent;

/// The consuming end of a live subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    cancel: CancellationToken,
}

/// The producing end of a live subscription, held by a store's forwarding task
/// or by a test injecting synthetic change sequences.
#[derive(Debug, Clone)]
pub struct SubscriptionSender {
    tx: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Create a connected sender/subscription pair with the given buffer size.
    pub fn channel(buffer: usize) -> (SubscriptionSender, Subscription) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        (
            SubscriptionSender {
                tx,
                cancel: cancel.clone(),
            },
            Subscription { rx, cancel },
        )
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the subscription is cancelled or the producer is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Tear the subscription down. Equivalent to dropping it.
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SubscriptionSender {
    /// Deliver an event. Returns `false` once the subscriber has gone away.
    pub async fn send(&self, event: ChangeEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the subscriber unsubscribes or drops.
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }
}
