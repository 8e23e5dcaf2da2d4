// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff inbox: every conversation still being handled, queue first.

use std::cmp::Ordering;
use std::collections::HashMap;

use barangay_core::{
    BarangayError, ChangeEvent, Conversation, ConversationId, ConversationStatus, DocumentStore,
    Query, Subscription, SubscriptionTarget, TransferRequest,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::records::{CONVERSATIONS, conversation_from_document};

/// One inbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub conversation: Conversation,
    /// A transfer addressed to the viewing staff member.
    pub transfer_for_me: Option<TransferRequest>,
}

impl InboxEntry {
    /// Waiting conversations first, then most recent activity.
    fn inbox_cmp(&self, other: &Self) -> Ordering {
        let queued = |e: &Self| e.conversation.status != ConversationStatus::Waiting;
        let activity = |e: &Self| {
            e.conversation
                .last_message
                .as_ref()
                .and_then(|m| m.at)
                .or(e.conversation.created_at)
        };
        queued(self)
            .cmp(&queued(other))
            .then_with(|| activity(other).cmp(&activity(self)))
            .then_with(|| self.conversation.id.0.cmp(&other.conversation.id.0))
    }
}

/// Maintains the inbox from a whole-collection subscription.
///
/// Status is filtered after normalization so documents with a legacy or
/// missing status still land in the right place.
#[derive(Debug)]
pub struct InboxProjector {
    staff_uid: String,
    entries: HashMap<ConversationId, InboxEntry>,
}

impl InboxProjector {
    pub fn new(staff_uid: impl Into<String>) -> Self {
        Self {
            staff_uid: staff_uid.into(),
            entries: HashMap::new(),
        }
    }

    fn upsert(&mut self, id: &str, conversation: Conversation) {
        let id = ConversationId::from(id);
        if conversation.status.is_terminal() {
            self.entries.remove(&id);
            return;
        }
        let transfer_for_me = conversation.transfer_awaiting(&self.staff_uid).cloned();
        self.entries.insert(
            id,
            InboxEntry {
                conversation,
                transfer_for_me,
            },
        );
    }

    /// Apply one change. Returns whether the visible list changed.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        let before = self.entries();
        match event {
            ChangeEvent::Snapshot(records) => {
                self.entries.clear();
                for record in records {
                    self.upsert(&record.id, conversation_from_document(&record.id, &record.data));
                }
            }
            ChangeEvent::Added(record) | ChangeEvent::Modified(record) => {
                self.upsert(&record.id, conversation_from_document(&record.id, &record.data));
            }
            ChangeEvent::Removed { id } => {
                self.entries.remove(&ConversationId(id));
            }
        }
        self.entries() != before
    }

    /// The rows in display order.
    pub fn entries(&self) -> Vec<InboxEntry> {
        let mut rows: Vec<InboxEntry> = self.entries.values().cloned().collect();
        rows.sort_by(InboxEntry::inbox_cmp);
        rows
    }

    pub fn transfers_for_me(&self) -> Vec<TransferRequest> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.transfer_for_me)
            .collect()
    }
}

/// A running inbox. Dropping it stops the task.
#[derive(Debug)]
pub struct InboxHandle {
    rows: watch::Receiver<Vec<InboxEntry>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl InboxHandle {
    pub async fn attach(store: &dyn DocumentStore, staff_uid: &str) -> Result<Self, BarangayError> {
        let subscription = store
            .subscribe(SubscriptionTarget::query(CONVERSATIONS, Query::new()))
            .await?;
        Ok(Self::from_subscription(subscription, InboxProjector::new(staff_uid)))
    }

    pub fn from_subscription(subscription: Subscription, projector: InboxProjector) -> Self {
        let (tx, rows) = watch::channel(projector.entries());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(projector, subscription, tx, cancel.clone()));
        Self {
            rows,
            cancel,
            task: Some(task),
        }
    }

    /// The current rows.
    pub fn rows(&self) -> Vec<InboxEntry> {
        self.rows.borrow().clone()
    }

    /// Wait for the rows to change. `false` once the inbox has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rows.changed().await.is_ok()
    }

    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "inbox task ended abnormally");
        }
        debug!("inbox detached");
    }
}

impl Drop for InboxHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut projector: InboxProjector,
    mut subscription: Subscription,
    rows: watch::Sender<Vec<InboxEntry>>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.next() => event,
        };
        let Some(event) = event else { break };
        if projector.apply(event) {
            let entries = projector.entries();
            debug!(rows = entries.len(), "inbox updated");
            if rows.send(entries).is_err() {
                break;
            }
        }
    }
    subscription.unsubscribe();
}
