// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Committed-change broadcast and the per-subscription forwarding task.
//!
//! Adapters publish a [`StoreChange`] for every committed write, in commit
//! order. Each live subscription runs a forwarder that subscribes to the
//! broadcast *before* reading its snapshot, so no commit can fall between
//! the two. Changes committed before the snapshot may be delivered again
//! afterwards; consumers deduplicate by id.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use barangay_core::{
    BarangayError, ChangeEvent, Document, DocumentRecord, Subscription, SubscriptionSender,
    SubscriptionTarget,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default capacity of the commit broadcast.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// A single committed write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// A top-level document was written. `data` is `None` after a delete.
    Document {
        collection: String,
        id: String,
        data: Option<Document>,
    },
    /// An entry was appended to a sub-collection.
    Child {
        collection: String,
        parent_id: String,
        name: String,
        record: DocumentRecord,
    },
}

/// Reads the current state of a subscription target.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    async fn snapshot(
        &self,
        target: &SubscriptionTarget,
    ) -> Result<Vec<DocumentRecord>, BarangayError>;
}

/// Fan-out of committed changes to every live subscription.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Arc<StoreChange>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announce a committed change. Call while the write is still serialized
    /// so publish order equals commit order.
    pub fn publish(&self, change: StoreChange) {
        // No receivers is not an error: nobody is watching.
        let _ = self.tx.send(Arc::new(change));
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Open a live subscription on `target`, backed by `source` for snapshots.
    pub async fn subscribe(
        &self,
        source: Arc<dyn SnapshotSource>,
        target: SubscriptionTarget,
        buffer: usize,
    ) -> Result<Subscription, BarangayError> {
        let rx = self.tx.subscribe();
        let initial = source.snapshot(&target).await?;
        let (sender, subscription) = Subscription::channel(buffer);
        tokio::spawn(forward(rx, source, target, initial, sender));
        Ok(subscription)
    }
}

async fn forward(
    mut rx: broadcast::Receiver<Arc<StoreChange>>,
    source: Arc<dyn SnapshotSource>,
    target: SubscriptionTarget,
    initial: Vec<DocumentRecord>,
    sender: SubscriptionSender,
) {
    let mut view = TargetView::new(target);
    if !sender.send(view.reset(initial)).await {
        return;
    }

    loop {
        let received = tokio::select! {
            biased;
            _ = sender.closed() => break,
            received = rx.recv() => received,
        };

        match received {
            Ok(change) => {
                for event in view.apply(&change) {
                    if !sender.send(event).await {
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscription lagged behind the change feed, resynchronizing");
                match source.snapshot(&view.target).await {
                    Ok(records) => {
                        if !sender.send(view.reset(records)).await {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "resnapshot failed, closing subscription");
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("subscription forwarder stopped");
}

/// What a forwarder knows about its target, enough to classify changes.
struct TargetView {
    target: SubscriptionTarget,
    /// Ids currently visible through the target.
    visible: HashSet<String>,
}

impl TargetView {
    fn new(target: SubscriptionTarget) -> Self {
        Self {
            target,
            visible: HashSet::new(),
        }
    }

    fn reset(&mut self, records: Vec<DocumentRecord>) -> ChangeEvent {
        self.visible = records.iter().map(|r| r.id.clone()).collect();
        ChangeEvent::Snapshot(records)
    }

    fn apply(&mut self, change: &StoreChange) -> Vec<ChangeEvent> {
        match (&self.target, change) {
            (
                SubscriptionTarget::Document { collection, id },
                StoreChange::Document {
                    collection: c,
                    id: changed,
                    data,
                },
            ) if c == collection && changed == id => self.track(id.clone(), data.clone()),

            (
                SubscriptionTarget::Query { collection, query },
                StoreChange::Document {
                    collection: c,
                    id,
                    data,
                },
            ) if c == collection => {
                let data = data.clone().filter(|d| query.matches(d));
                self.track(id.clone(), data)
            }

            (
                SubscriptionTarget::Subcollection {
                    collection,
                    id,
                    name,
                },
                StoreChange::Child {
                    collection: c,
                    parent_id,
                    name: n,
                    record,
                },
            ) if c == collection && parent_id == id && n == name => {
                self.visible.insert(record.id.clone());
                vec![ChangeEvent::Added(record.clone())]
            }

            // Deleting the parent empties its sub-collection.
            (
                SubscriptionTarget::Subcollection { collection, id, .. },
                StoreChange::Document {
                    collection: c,
                    id: changed,
                    data: None,
                },
            ) if c == collection && changed == id => self
                .visible
                .drain()
                .map(|id| ChangeEvent::Removed { id })
                .collect(),

            _ => Vec::new(),
        }
    }

    fn track(&mut self, id: String, data: Option<Document>) -> Vec<ChangeEvent> {
        let was_visible = self.visible.contains(&id);
        match (was_visible, data) {
            (true, Some(data)) => vec![ChangeEvent::Modified(DocumentRecord::new(id, data))],
            (false, Some(data)) => {
                self.visible.insert(id.clone());
                vec![ChangeEvent::Added(DocumentRecord::new(id, data))]
            }
            (true, None) => {
                self.visible.remove(&id);
                vec![ChangeEvent::Removed { id }]
            }
            (false, None) => Vec::new(),
        }
    }
}
