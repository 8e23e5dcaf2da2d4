// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live feed projection for one open conversation view.
//!
//! [`FeedProjector`] turns the two change streams of a conversation (the
//! document and its messages) into [`FeedUpdate`]s. It is idempotent: a
//! message id is rendered at most once no matter how often the store
//! redelivers it, and the initial history never raises a notification.
//! [`FeedHandle`] runs a projector on a task until detached.

use std::collections::HashSet;

use barangay_core::{
    BarangayError, ChangeEvent, Conversation, ConversationId, ConversationStatus, DocumentStore,
    MessageId, Sender, StaffRole, SubscriptionTarget, Subscription, Timestamp, TransferRequest,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::records::{CONVERSATIONS, MESSAGES, conversation_from_document, message_from_record};
use crate::render::RenderedMessage;

/// Who is looking at the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Resident { uid: String },
    Staff { uid: String, role: StaffRole },
}

impl Viewer {
    /// Messages from the other side raise the notification indicator.
    fn is_counterpart(&self, sender: Sender) -> bool {
        match self {
            Viewer::Resident { .. } => sender != Sender::User,
            Viewer::Staff { .. } => sender == Sender::User,
        }
    }

    fn may_send(&self, conversation: &Conversation) -> bool {
        match self {
            Viewer::Resident { .. } => !conversation.status.is_terminal(),
            Viewer::Staff { uid, role } => conversation.permits_staff_reply(uid, *role),
        }
    }
}

/// Terminal summary shown once a conversation is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryCard {
    pub resolved_by: Option<String>,
    pub resolved_at: Option<Timestamp>,
    pub note: String,
}

/// A change the view must render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// The full existing history, rendered once.
    HistoryLoaded(Vec<RenderedMessage>),
    /// A new message, inserted at `position` in display order.
    MessageAppended {
        position: usize,
        message: RenderedMessage,
    },
    StatusChanged(ConversationStatus),
    ComposerChanged { enabled: bool },
    Resolved(SummaryCard),
    Reopened,
    /// A transfer addressed to the viewing staff member.
    TransferPending(TransferRequest),
    NotificationChanged(bool),
    ConversationGone,
}

/// Pure projection state for one conversation view.
#[derive(Debug)]
pub struct FeedProjector {
    viewer: Viewer,
    messages: Vec<RenderedMessage>,
    seen: HashSet<MessageId>,
    history_loaded: bool,
    conversation: Option<Conversation>,
    composer_enabled: Option<bool>,
    announced_transfer: Option<TransferRequest>,
    focused: bool,
    notification: bool,
    gone: bool,
}

impl FeedProjector {
    pub fn new(viewer: Viewer, focused: bool) -> Self {
        Self {
            viewer,
            messages: Vec::new(),
            seen: HashSet::new(),
            history_loaded: false,
            conversation: None,
            composer_enabled: None,
            announced_transfer: None,
            focused,
            notification: false,
            gone: false,
        }
    }

    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn composer_enabled(&self) -> bool {
        self.composer_enabled.unwrap_or(false)
    }

    pub fn composer_state(&self) -> Option<bool> {
        self.composer_enabled
    }

    pub fn notification(&self) -> bool {
        self.notification
    }

    fn insert(&mut self, message: RenderedMessage) -> Option<usize> {
        if !self.seen.insert(message.id.clone()) {
            return None;
        }
        let position = self
            .messages
            .partition_point(|m| m.display_cmp(&message).is_le());
        self.messages.insert(position, message);
        Some(position)
    }

    /// Apply a change from the message sub-collection.
    pub fn on_messages(&mut self, event: ChangeEvent) -> Vec<FeedUpdate> {
        match event {
            ChangeEvent::Snapshot(records) if !self.history_loaded => {
                for record in &records {
                    self.insert(RenderedMessage::from_message(message_from_record(record)));
                }
                self.history_loaded = true;
                vec![FeedUpdate::HistoryLoaded(self.messages.clone())]
            }
            // A resync after lag: anything unseen is new.
            ChangeEvent::Snapshot(records) => records
                .iter()
                .flat_map(|r| self.on_added(RenderedMessage::from_message(message_from_record(r))))
                .collect(),
            ChangeEvent::Added(record) => {
                let message = RenderedMessage::from_message(message_from_record(&record));
                if self.history_loaded {
                    self.on_added(message)
                } else {
                    // Arrived ahead of the snapshot; it becomes part of history.
                    self.insert(message);
                    Vec::new()
                }
            }
            // Messages are immutable; edits and removals are not rendered.
            ChangeEvent::Modified(_) | ChangeEvent::Removed { .. } => Vec::new(),
        }
    }

    fn on_added(&mut self, message: RenderedMessage) -> Vec<FeedUpdate> {
        let counterpart = self.viewer.is_counterpart(message.sender);
        let Some(position) = self.insert(message.clone()) else {
            return Vec::new();
        };
        let mut updates = vec![FeedUpdate::MessageAppended { position, message }];
        if counterpart && !self.focused && !self.notification {
            self.notification = true;
            updates.push(FeedUpdate::NotificationChanged(true));
        }
        updates
    }

    /// Apply a change to the conversation document.
    pub fn on_conversation(&mut self, event: ChangeEvent) -> Vec<FeedUpdate> {
        let record = match event {
            ChangeEvent::Snapshot(mut records) => match records.pop() {
                Some(record) => record,
                None => return self.on_gone(),
            },
            ChangeEvent::Added(record) | ChangeEvent::Modified(record) => record,
            ChangeEvent::Removed { .. } => return self.on_gone(),
        };
        self.gone = false;
        self.apply(conversation_from_document(&record.id, &record.data))
    }

    fn on_gone(&mut self) -> Vec<FeedUpdate> {
        if self.gone {
            return Vec::new();
        }
        self.gone = true;
        self.conversation = None;
        let mut updates = vec![FeedUpdate::ConversationGone];
        if self.composer_enabled != Some(false) {
            self.composer_enabled = Some(false);
            updates.push(FeedUpdate::ComposerChanged { enabled: false });
        }
        updates
    }

    fn apply(&mut self, next: Conversation) -> Vec<FeedUpdate> {
        let mut updates = Vec::new();
        let previous = self.conversation.take().map(|c| c.status);

        if previous != Some(next.status) {
            updates.push(FeedUpdate::StatusChanged(next.status));
            if next.status.is_terminal() {
                updates.push(FeedUpdate::Resolved(SummaryCard {
                    resolved_by: next.resolution.as_ref().map(|r| r.by.clone()),
                    resolved_at: next.resolution.as_ref().and_then(|r| r.at),
                    note: next
                        .resolution
                        .as_ref()
                        .map(|r| r.note.clone())
                        .unwrap_or_default(),
                }));
            } else if previous.is_some_and(|p| p.is_terminal()) {
                updates.push(FeedUpdate::Reopened);
            }
        }

        let enabled = self.viewer.may_send(&next);
        if self.composer_enabled != Some(enabled) {
            self.composer_enabled = Some(enabled);
            updates.push(FeedUpdate::ComposerChanged { enabled });
        }

        if let Viewer::Staff { uid, .. } = &self.viewer {
            let awaiting = next.transfer_awaiting(uid).cloned();
            if awaiting.is_some() && awaiting != self.announced_transfer {
                updates.extend(awaiting.clone().map(FeedUpdate::TransferPending));
            }
            self.announced_transfer = awaiting;
        }

        self.conversation = Some(next);
        updates
    }

    /// The view gained or lost focus. Gaining focus clears the indicator.
    pub fn set_focused(&mut self, focused: bool) -> Vec<FeedUpdate> {
        self.focused = focused;
        if focused && self.notification {
            self.notification = false;
            return vec![FeedUpdate::NotificationChanged(false)];
        }
        Vec::new()
    }
}

/// A running feed: a projector on a task fed by both subscriptions.
///
/// Dropping the handle cancels the task; [`FeedHandle::detach`] also waits
/// for it to finish, after which both subscriptions are gone.
#[derive(Debug)]
pub struct FeedHandle {
    conversation_id: ConversationId,
    updates: mpsc::Receiver<FeedUpdate>,
    focus: watch::Sender<bool>,
    composer: watch::Receiver<Option<bool>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Subscribe to conversation `id` and start projecting.
    pub async fn attach(
        store: &dyn DocumentStore,
        id: &ConversationId,
        viewer: Viewer,
        focused: bool,
        buffer: usize,
    ) -> Result<Self, BarangayError> {
        let conversation = store
            .subscribe(SubscriptionTarget::document(CONVERSATIONS, &id.0))
            .await?;
        let messages = store
            .subscribe(SubscriptionTarget::subcollection(CONVERSATIONS, &id.0, MESSAGES))
            .await?;
        Ok(Self::from_subscriptions(
            id.clone(),
            conversation,
            messages,
            FeedProjector::new(viewer, focused),
            buffer,
        ))
    }

    /// Run `projector` over already-open subscriptions.
    pub fn from_subscriptions(
        conversation_id: ConversationId,
        conversation: Subscription,
        messages: Subscription,
        projector: FeedProjector,
        buffer: usize,
    ) -> Self {
        let (tx, updates) = mpsc::channel(buffer.max(1));
        let (focus, focus_rx) = watch::channel(projector.focused);
        let (composer_tx, composer) = watch::channel(projector.composer_state());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            projector,
            conversation,
            messages,
            focus_rx,
            composer_tx,
            tx,
            cancel.clone(),
        ));
        debug!(conversation_id = %conversation_id, "feed attached");
        Self {
            conversation_id,
            updates,
            focus,
            composer,
            cancel,
            task: Some(task),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Wait for the next update. `None` once the feed has stopped.
    pub async fn next(&mut self) -> Option<FeedUpdate> {
        self.updates.recv().await
    }

    /// An update if one is ready now.
    pub fn try_next(&mut self) -> Option<FeedUpdate> {
        self.updates.try_recv().ok()
    }

    pub fn set_focused(&self, focused: bool) {
        self.focus.send_replace(focused);
    }

    /// Whether the input control is enabled. `None` until the
    /// conversation document has been read.
    pub fn composer_enabled(&self) -> Option<bool> {
        *self.composer.borrow()
    }

    /// Stop the feed and wait until its subscriptions are torn down.
    pub async fn detach(mut self) {
        self.cancel.cancel();
        // Unread updates must not hold the task in `send`.
        self.updates.close();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "feed task ended abnormally");
        }
        debug!(conversation_id = %self.conversation_id, "feed detached");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut projector: FeedProjector,
    mut conversation: Subscription,
    mut messages: Subscription,
    mut focus: watch::Receiver<bool>,
    composer: watch::Sender<Option<bool>>,
    tx: mpsc::Sender<FeedUpdate>,
    cancel: CancellationToken,
) {
    let (mut conversation_open, mut messages_open) = (true, true);
    while conversation_open || messages_open {
        let updates = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = conversation.next(), if conversation_open => match event {
                Some(event) => projector.on_conversation(event),
                None => {
                    conversation_open = false;
                    Vec::new()
                }
            },
            event = messages.next(), if messages_open => match event {
                Some(event) => projector.on_messages(event),
                None => {
                    messages_open = false;
                    Vec::new()
                }
            },
            changed = focus.changed() => match changed {
                Ok(()) => {
                    let focused = *focus.borrow_and_update();
                    projector.set_focused(focused)
                }
                // The handle is gone.
                Err(_) => break,
            },
        };

        composer.send_if_modified(|enabled| {
            let now = projector.composer_state();
            let changed = *enabled != now;
            *enabled = now;
            changed
        });
        for update in updates {
            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = tx.send(update) => sent.is_ok(),
            };
            if !delivered {
                conversation.unsubscribe();
                messages.unsubscribe();
                return;
            }
        }
    }
    conversation.unsubscribe();
    messages.unsubscribe();
}
