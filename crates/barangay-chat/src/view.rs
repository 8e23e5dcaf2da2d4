// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-view lifecycle objects.
//!
//! A [`ResidentChatView`] or [`StaffConsole`] owns the subscriptions of the
//! conversation it shows. Switching conversations detaches the old feed
//! before the new one is attached, so an old thread can never write into
//! the new view.

use std::sync::Arc;

use barangay_core::{
    BarangayError, ConversationId, Identity, IdentityProvider, MessageId, Notice, StaffRole,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::coordinator::{
    ClaimOutcome, EscalationCoordinator, EscalationOutcome, ResidentSend, TransferOutcome,
};
use crate::feed::{FeedHandle, FeedUpdate, Viewer};
use crate::inbox::InboxHandle;
use crate::send_lock::SendLock;
use crate::session::{SessionResolver, wait_for_identity};

/// Convert a failed action into the notice shown to its actor.
///
/// Store failures are logged here, where they are caught.
pub fn report(action: &str, err: &BarangayError) -> Notice {
    if err.is_transient() {
        error!(action, error = %err, "store operation failed");
    } else {
        warn!(action, error = %err, "action failed");
    }
    err.notice()
}

/// The resident's chat window.
pub struct ResidentChatView {
    coordinator: Arc<EscalationCoordinator>,
    sessions: Arc<SessionResolver>,
    identity: Identity,
    feed: Option<FeedHandle>,
    focused: bool,
}

impl ResidentChatView {
    /// Resolve the resident's session and start its live feed.
    pub async fn attach(
        coordinator: Arc<EscalationCoordinator>,
        sessions: Arc<SessionResolver>,
        identity: Identity,
        focused: bool,
    ) -> Result<Self, BarangayError> {
        let mut view = Self {
            coordinator,
            sessions,
            identity,
            feed: None,
            focused,
        };
        view.open_session().await?;
        Ok(view)
    }

    /// Wait for auth to produce an identity, then attach.
    ///
    /// `Ok(None)` if `cancel` fires first.
    pub async fn attach_when_signed_in(
        coordinator: Arc<EscalationCoordinator>,
        sessions: Arc<SessionResolver>,
        identity: &dyn IdentityProvider,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>, BarangayError> {
        let retry = std::time::Duration::from_millis(coordinator.config().identity_retry_ms);
        let Some(identity) = wait_for_identity(identity, retry, cancel).await else {
            return Ok(None);
        };
        Self::attach(coordinator, sessions, identity, true).await.map(Some)
    }

    async fn open_session(&mut self) -> Result<ConversationId, BarangayError> {
        let id = self.sessions.resolve_session(&self.identity).await?;
        let feed = FeedHandle::attach(
            self.coordinator.store().as_ref(),
            &id,
            Viewer::Resident {
                uid: self.identity.uid.clone(),
            },
            self.focused,
            self.coordinator.config().subscription_buffer,
        )
        .await?;
        info!(conversation_id = %id, resident = %self.identity.uid, "resident view attached");
        self.feed = Some(feed);
        Ok(id)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.feed.as_ref().map(FeedHandle::conversation_id)
    }

    fn current(&self) -> Result<&FeedHandle, BarangayError> {
        self.feed
            .as_ref()
            .ok_or_else(|| BarangayError::Internal("resident view is detached".into()))
    }

    /// Whether the input control is enabled: false exactly while resolved.
    pub fn composer_enabled(&self) -> bool {
        self.feed
            .as_ref()
            .is_some_and(|f| f.composer_enabled() != Some(false))
    }

    /// The next change to render. `None` once detached.
    pub async fn next_update(&mut self) -> Option<FeedUpdate> {
        match self.feed.as_mut() {
            Some(feed) => feed.next().await,
            None => None,
        }
    }

    pub fn try_next_update(&mut self) -> Option<FeedUpdate> {
        self.feed.as_mut().and_then(FeedHandle::try_next)
    }

    pub async fn send_resident_message(&self, text: &str) -> Result<ResidentSend, BarangayError> {
        let feed = self.current()?;
        if feed.composer_enabled() == Some(false) {
            return Err(BarangayError::InputRejected(
                "This conversation has been resolved. Start a new conversation to ask something else."
                    .into(),
            ));
        }
        self.coordinator
            .send_resident_message(feed.conversation_id(), &self.identity, text)
            .await
    }

    pub async fn accept_escalation_offer(&self) -> Result<EscalationOutcome, BarangayError> {
        let feed = self.current()?;
        self.coordinator
            .accept_escalation_offer(feed.conversation_id(), &self.identity)
            .await
    }

    /// Leave a resolved conversation and begin a fresh one.
    pub async fn start_new_conversation_after_resolution(
        &mut self,
    ) -> Result<ConversationId, BarangayError> {
        if let Some(feed) = self.feed.take() {
            feed.detach().await;
        }
        self.open_session().await
    }

    /// Focus changes clear the notification indicator and the unread flag.
    pub async fn set_focused(&mut self, focused: bool) -> Result<(), BarangayError> {
        self.focused = focused;
        let feed = self.current()?;
        feed.set_focused(focused);
        if focused {
            self.coordinator
                .mark_read_by_resident(feed.conversation_id(), &self.identity)
                .await?;
        }
        Ok(())
    }

    pub async fn detach(mut self) {
        if let Some(feed) = self.feed.take() {
            feed.detach().await;
        }
        info!(resident = %self.identity.uid, "resident view detached");
    }
}

/// A signed-in staff member's console.
pub struct StaffConsole {
    uid: String,
    role: StaffRole,
    coordinator: Arc<EscalationCoordinator>,
    send_lock: SendLock,
    open: Option<FeedHandle>,
}

impl StaffConsole {
    /// Fails with PermissionDenied if `uid` is not staff.
    pub async fn sign_in(
        coordinator: Arc<EscalationCoordinator>,
        uid: &str,
    ) -> Result<Self, BarangayError> {
        let member = coordinator.staff_member(uid).await?.ok_or_else(|| {
            BarangayError::permission_denied("open the staff console", "you are not a member of the office staff")
        })?;
        let send_lock = SendLock::from_millis(coordinator.config().send_lock_ms);
        info!(staff = uid, role = %member.role, "staff console signed in");
        Ok(Self {
            uid: member.uid,
            role: member.role,
            coordinator,
            send_lock,
            open: None,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn role(&self) -> StaffRole {
        self.role
    }

    /// Live list of conversations still being handled.
    pub async fn inbox(&self) -> Result<InboxHandle, BarangayError> {
        InboxHandle::attach(self.coordinator.store().as_ref(), &self.uid).await
    }

    /// Show conversation `id`, replacing whatever was open.
    pub async fn open(&mut self, id: &ConversationId) -> Result<(), BarangayError> {
        self.close().await;
        let feed = FeedHandle::attach(
            self.coordinator.store().as_ref(),
            id,
            Viewer::Staff {
                uid: self.uid.clone(),
                role: self.role,
            },
            true,
            self.coordinator.config().subscription_buffer,
        )
        .await?;
        self.open = Some(feed);
        self.coordinator.mark_read_by_staff(id, &self.uid).await
    }

    pub async fn close(&mut self) {
        if let Some(feed) = self.open.take() {
            feed.detach().await;
        }
    }

    pub fn current(&self) -> Option<&ConversationId> {
        self.open.as_ref().map(FeedHandle::conversation_id)
    }

    pub fn composer_enabled(&self) -> bool {
        !self.send_lock.is_locked()
            && self
                .open
                .as_ref()
                .is_some_and(|f| f.composer_enabled() == Some(true))
    }

    pub async fn next_update(&mut self) -> Option<FeedUpdate> {
        match self.open.as_mut() {
            Some(feed) => feed.next().await,
            None => None,
        }
    }

    pub fn try_next_update(&mut self) -> Option<FeedUpdate> {
        self.open.as_mut().and_then(FeedHandle::try_next)
    }

    pub async fn claim(&self, id: &ConversationId) -> Result<ClaimOutcome, BarangayError> {
        self.coordinator.claim(id, &self.uid).await
    }

    /// Send a reply. `Ok(None)` when the previous submit is still locking
    /// the composer.
    pub async fn send(
        &mut self,
        id: &ConversationId,
        text: &str,
    ) -> Result<Option<MessageId>, BarangayError> {
        if !self.send_lock.try_acquire() {
            return Ok(None);
        }
        match self.coordinator.send_staff_message(id, &self.uid, text).await {
            Ok(message_id) => Ok(Some(message_id)),
            Err(e) => {
                self.send_lock.release();
                Err(e)
            }
        }
    }

    pub async fn request_transfer(
        &self,
        id: &ConversationId,
        target: &str,
        reason: Option<&str>,
    ) -> Result<TransferOutcome, BarangayError> {
        self.coordinator
            .request_transfer(id, &self.uid, target, reason)
            .await
    }

    pub async fn accept_transfer(&self, id: &ConversationId) -> Result<TransferOutcome, BarangayError> {
        self.coordinator.accept_transfer(id, &self.uid).await
    }

    pub async fn reject_transfer(&self, id: &ConversationId) -> Result<TransferOutcome, BarangayError> {
        self.coordinator.reject_transfer(id, &self.uid).await
    }

    pub async fn resolve(&self, id: &ConversationId, note: Option<&str>) -> Result<(), BarangayError> {
        self.coordinator.resolve(id, &self.uid, note).await
    }

    pub async fn reopen(&self, id: &ConversationId) -> Result<(), BarangayError> {
        self.coordinator.reopen(id, &self.uid).await
    }

    pub async fn sign_out(mut self) {
        self.close().await;
        info!(staff = %self.uid, "staff console signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barangay_core::NoticeKind;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn store_failures_are_logged_at_error() {
        let notice = report("send", &BarangayError::storage("connection reset"));
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(!notice.text.contains("connection reset"));
        assert!(logs_contain("store operation failed"));
    }

    #[traced_test]
    #[test]
    fn rejections_are_logged_as_warnings() {
        let notice = report(
            "reply",
            &BarangayError::permission_denied("reply", "not yours"),
        );
        assert_eq!(notice.kind, NoticeKind::Warning);
        assert!(logs_contain("action failed"));
    }
}
