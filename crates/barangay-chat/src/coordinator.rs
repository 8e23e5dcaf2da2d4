// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The escalation state machine.
//!
//! Every operation reads the conversation, checks the caller against the
//! transition table and the ownership rules, then writes. Status-changing
//! writes are compare-and-swap on the status that was read, so a stale
//! caller loses cleanly instead of overwriting a newer state. The one
//! exception is an unconditional claim when `chat.conditional_claim` is off.

use std::sync::Arc;
use std::time::Duration;

use barangay_bot::{BotReply, BotResponder};
use barangay_config::model::ChatConfig;
use barangay_core::{
    BarangayError, Conversation, ConversationId, ConversationStatus, Document, DocumentStore,
    Identity, MessageId, Precondition, Sender, StaffMember, StaffRole, StaffDirectory,
    Timestamp, TransferKind, TransferRequest, TransferStatus, timestamp_value,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::records::{
    self, CONVERSATIONS, MESSAGES, Patch, conversation_from_document, fields, raw_status,
};
use crate::state::{Event, next_status};

/// Result of a staff claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// Someone else got there first. `by` is the owner as last read.
    AlreadyClaimed { by: Option<String> },
}

/// Result of a resident accepting the talk-to-staff offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    Escalated,
    /// Already queued or being handled.
    AlreadyEscalated(ConversationStatus),
}

/// A bot reply that was written to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotTurn {
    pub message_id: MessageId,
    pub reply: BotReply,
}

/// Result of a resident message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentSend {
    pub message_id: MessageId,
    /// Present when the conversation was still with the bot.
    pub bot: Option<BotTurn>,
}

/// Result of a transfer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Requested(TransferRequest),
    Accepted { new_owner: String },
    Rejected,
    /// The request changed between read and write; nothing was applied.
    Superseded,
}

/// Applies resident and staff actions to conversations.
pub struct EscalationCoordinator {
    store: Arc<dyn DocumentStore>,
    staff: Arc<dyn StaffDirectory>,
    bot: BotResponder,
    config: ChatConfig,
}

fn denied(action: &str, reason: &str) -> BarangayError {
    warn!(action, reason, "action denied");
    BarangayError::permission_denied(action, reason)
}

fn illegal(from: ConversationStatus, event: Event) -> BarangayError {
    warn!(status = %from, event = ?event, "transition rejected");
    BarangayError::invalid_transition(from, event.verb())
}

impl EscalationCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        staff: Arc<dyn StaffDirectory>,
        bot: BotResponder,
        config: ChatConfig,
    ) -> Self {
        if !config.conditional_claim {
            warn!("conditional claim disabled: concurrent claims are last-write-wins");
        }
        Self {
            store,
            staff,
            bot,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Directory entry for `uid`, `None` if they are not staff.
    pub async fn staff_member(&self, uid: &str) -> Result<Option<StaffMember>, BarangayError> {
        self.staff.staff_member(uid).await
    }

    /// Current typed state of a conversation.
    pub async fn conversation(&self, id: &ConversationId) -> Result<Conversation, BarangayError> {
        Ok(self.load(id).await?.1)
    }

    async fn load(&self, id: &ConversationId) -> Result<(Document, Conversation), BarangayError> {
        let doc = self
            .store
            .get_document(CONVERSATIONS, &id.0)
            .await?
            .ok_or_else(|| BarangayError::not_found(CONVERSATIONS, &id.0))?;
        let conversation = conversation_from_document(&id.0, &doc);
        Ok((doc, conversation))
    }

    async fn require_staff(&self, uid: &str, action: &str) -> Result<StaffMember, BarangayError> {
        self.staff
            .staff_member(uid)
            .await?
            .ok_or_else(|| denied(action, "you are not a member of the office staff"))
    }

    async fn staff_name(&self, uid: &str) -> String {
        match self.staff.staff_member(uid).await {
            Ok(Some(member)) => member.display_name,
            _ => uid.to_string(),
        }
    }

    /// Compare-and-swap on the status as read in `doc`, plus `extra` guards.
    async fn swap(
        &self,
        id: &ConversationId,
        doc: &Document,
        extra: Vec<Precondition>,
        patch: Patch,
    ) -> Result<bool, BarangayError> {
        let mut guards = vec![Precondition::equals(fields::STATUS, raw_status(doc))];
        guards.extend(extra);
        self.store
            .update_fields_if(CONVERSATIONS, &id.0, &guards, patch.into_document())
            .await
    }

    async fn append(
        &self,
        id: &ConversationId,
        sender: Sender,
        text: &str,
        escalation_offer: bool,
    ) -> Result<(MessageId, Timestamp), BarangayError> {
        let at = self.store.server_timestamp();
        let entry = records::message_entry(sender, text, at, escalation_offer);
        let message_id = self
            .store
            .append_to_subcollection(CONVERSATIONS, &id.0, MESSAGES, entry)
            .await?;
        debug!(conversation_id = %id, sender = %sender, message_id = %message_id, "message appended");
        Ok((MessageId(message_id), at))
    }

    async fn announce(&self, id: &ConversationId, text: &str) -> Result<(), BarangayError> {
        self.append(id, Sender::System, text, false).await.map(|_| ())
    }

    // --- Resident side ---

    fn require_resident(
        conversation: &Conversation,
        resident: &Identity,
        action: &str,
    ) -> Result<(), BarangayError> {
        if conversation.resident_id == resident.uid {
            Ok(())
        } else {
            Err(denied(action, "this conversation belongs to another resident"))
        }
    }

    /// Record a resident message. While the bot is handling the conversation
    /// the bot's reply follows after the typing delay.
    pub async fn send_resident_message(
        &self,
        id: &ConversationId,
        resident: &Identity,
        text: &str,
    ) -> Result<ResidentSend, BarangayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BarangayError::InputRejected("Type a message first.".into()));
        }
        let (_, conversation) = self.load(id).await?;
        Self::require_resident(&conversation, resident, "send a message")?;
        if conversation.status.is_terminal() {
            warn!(conversation_id = %id, "resident input refused on resolved conversation");
            return Err(BarangayError::InputRejected(
                "This conversation has been resolved. Start a new conversation to ask something else."
                    .into(),
            ));
        }

        let (message_id, at) = self.append(id, Sender::User, text, false).await?;
        let mut patch = Patch::new().last_message(Sender::User, text, at);
        if conversation.status != ConversationStatus::Bot {
            patch = patch.set(fields::UNREAD_STAFF, true);
        }
        self.store
            .update_fields(CONVERSATIONS, &id.0, patch.into_document())
            .await?;

        let bot = if conversation.status == ConversationStatus::Bot {
            self.bot_turn(id, text).await?
        } else {
            None
        };
        Ok(ResidentSend { message_id, bot })
    }

    async fn bot_turn(&self, id: &ConversationId, text: &str) -> Result<Option<BotTurn>, BarangayError> {
        let reply = self.bot.respond(text);
        tokio::time::sleep(Duration::from_millis(self.config.bot_typing_delay_ms)).await;

        // The resident may have escalated while the bot was "typing".
        let (_, current) = self.load(id).await?;
        if current.status != ConversationStatus::Bot {
            debug!(conversation_id = %id, status = %current.status, "bot reply skipped");
            return Ok(None);
        }

        let (message_id, at) = self
            .append(id, Sender::Bot, reply.text(), reply.offers_escalation())
            .await?;
        self.store
            .update_fields(
                CONVERSATIONS,
                &id.0,
                Patch::new()
                    .last_message(Sender::Bot, reply.text(), at)
                    .into_document(),
            )
            .await?;
        Ok(Some(BotTurn { message_id, reply }))
    }

    /// Move a bot conversation into the staff queue.
    pub async fn accept_escalation_offer(
        &self,
        id: &ConversationId,
        resident: &Identity,
    ) -> Result<EscalationOutcome, BarangayError> {
        let (doc, conversation) = self.load(id).await?;
        Self::require_resident(&conversation, resident, "ask for staff")?;
        match conversation.status {
            ConversationStatus::Waiting | ConversationStatus::Active => {
                return Ok(EscalationOutcome::AlreadyEscalated(conversation.status));
            }
            ConversationStatus::Resolved => return Err(illegal(conversation.status, Event::Escalate)),
            ConversationStatus::Bot => {}
        }
        let Some(next) = next_status(conversation.status, Event::Escalate) else {
            return Err(illegal(conversation.status, Event::Escalate));
        };

        let patch = Patch::new().status(next).set(fields::UNREAD_STAFF, true);
        if !self.swap(id, &doc, Vec::new(), patch).await? {
            let (_, now) = self.load(id).await?;
            return match now.status {
                ConversationStatus::Resolved => Err(illegal(now.status, Event::Escalate)),
                status => Ok(EscalationOutcome::AlreadyEscalated(status)),
            };
        }
        self.announce(id, "You've been added to the queue. A staff member will join this chat shortly.")
            .await?;
        info!(conversation_id = %id, "conversation escalated to staff queue");
        Ok(EscalationOutcome::Escalated)
    }

    /// Clear the resident's unread flag.
    pub async fn mark_read_by_resident(
        &self,
        id: &ConversationId,
        resident: &Identity,
    ) -> Result<(), BarangayError> {
        let (_, conversation) = self.load(id).await?;
        Self::require_resident(&conversation, resident, "mark as read")?;
        if conversation.unread_resident {
            self.store
                .update_fields(
                    CONVERSATIONS,
                    &id.0,
                    Patch::new().set(fields::UNREAD_RESIDENT, false).into_document(),
                )
                .await?;
        }
        Ok(())
    }

    // --- Staff side ---

    /// Take ownership of a waiting conversation.
    pub async fn claim(&self, id: &ConversationId, staff_uid: &str) -> Result<ClaimOutcome, BarangayError> {
        let member = self.require_staff(staff_uid, "claim a conversation").await?;
        let (doc, conversation) = self.load(id).await?;
        let Some(next) = next_status(conversation.status, Event::Claim) else {
            if conversation.status == ConversationStatus::Active {
                return Ok(ClaimOutcome::AlreadyClaimed {
                    by: conversation.taken_over_by,
                });
            }
            return Err(denied(
                "claim a conversation",
                "only conversations waiting in the queue can be claimed",
            ));
        };

        let patch = Patch::new()
            .status(next)
            .set(fields::TAKEN_OVER_BY, staff_uid);
        let applied = if self.config.conditional_claim {
            self.swap(id, &doc, Vec::new(), patch).await?
        } else {
            self.store
                .update_fields(CONVERSATIONS, &id.0, patch.into_document())
                .await?;
            true
        };
        if !applied {
            let (_, now) = self.load(id).await?;
            info!(conversation_id = %id, staff = staff_uid, winner = ?now.taken_over_by, "claim lost");
            return Ok(ClaimOutcome::AlreadyClaimed {
                by: now.taken_over_by,
            });
        }

        self.announce(id, &format!("{} has joined the conversation.", member.display_name))
            .await?;
        info!(conversation_id = %id, staff = staff_uid, "conversation claimed");
        Ok(ClaimOutcome::Claimed)
    }

    /// Append a staff reply. Only the owner or an admin may reply, and only
    /// while the conversation is active.
    pub async fn send_staff_message(
        &self,
        id: &ConversationId,
        staff_uid: &str,
        text: &str,
    ) -> Result<MessageId, BarangayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BarangayError::InputRejected("Type a message first.".into()));
        }
        let member = self.require_staff(staff_uid, "reply").await?;
        let (_, conversation) = self.load(id).await?;
        if conversation.status != ConversationStatus::Active {
            return Err(denied("reply", "replies are only possible while the conversation is active"));
        }
        if !conversation.permits_staff_reply(staff_uid, member.role) {
            return Err(denied("reply", "another staff member is handling this conversation"));
        }

        let (message_id, at) = self.append(id, Sender::Staff, text, false).await?;
        self.store
            .update_fields(
                CONVERSATIONS,
                &id.0,
                Patch::new()
                    .last_message(Sender::Staff, text, at)
                    .set(fields::UNREAD_RESIDENT, true)
                    .into_document(),
            )
            .await?;
        Ok(message_id)
    }

    /// Start a handshake. The owner hands off to `target`; anyone else asks
    /// the owner (`target` must then be the owner) for a takeover.
    pub async fn request_transfer(
        &self,
        id: &ConversationId,
        staff_uid: &str,
        target: &str,
        reason: Option<&str>,
    ) -> Result<TransferOutcome, BarangayError> {
        const ACTION: &str = "request a transfer";
        self.require_staff(staff_uid, ACTION).await?;
        if target == staff_uid {
            return Err(BarangayError::InputRejected(
                "Choose a different staff member.".into(),
            ));
        }
        if self.staff.staff_member(target).await?.is_none() {
            return Err(denied(ACTION, "the target is not a member of the office staff"));
        }
        let (doc, conversation) = self.load(id).await?;
        if next_status(conversation.status, Event::RequestTransfer).is_none() {
            return Err(illegal(conversation.status, Event::RequestTransfer));
        }
        if conversation.pending_transfer.is_some() {
            return Err(illegal(conversation.status, Event::RequestTransfer));
        }

        let Some(owner) = conversation.taken_over_by.clone() else {
            return Err(denied(ACTION, "nobody owns this conversation"));
        };
        let request = if owner == staff_uid {
            TransferRequest {
                to: target.to_string(),
                from: staff_uid.to_string(),
                kind: TransferKind::Handoff,
                reason: reason.map(str::to_string),
            }
        } else if owner == target {
            TransferRequest {
                to: owner.clone(),
                from: staff_uid.to_string(),
                kind: TransferKind::Takeover,
                reason: reason.map(str::to_string),
            }
        } else {
            return Err(denied(ACTION, "only the owner can hand this conversation to someone else"));
        };

        let mut patch = Patch::new()
            .set(fields::PENDING_TRANSFER_TO, request.to.as_str())
            .set(fields::PENDING_TRANSFER_FROM, request.from.as_str())
            .set(fields::TRANSFER_STATUS, TransferStatus::Pending.as_str())
            .set(fields::TRANSFER_KIND, request.kind.as_str());
        patch = match request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => patch.set(fields::TRANSFER_REASON, r),
            None => patch.clear(fields::TRANSFER_REASON),
        };
        let guards = vec![
            Precondition::equals(fields::TAKEN_OVER_BY, owner.as_str()),
            Precondition::absent(fields::PENDING_TRANSFER_TO),
        ];
        if !self.swap(id, &doc, guards, patch).await? {
            return Ok(TransferOutcome::Superseded);
        }
        info!(conversation_id = %id, from = %request.from, to = %request.to, kind = %request.kind, "transfer requested");
        Ok(TransferOutcome::Requested(request))
    }

    async fn pending_for(
        &self,
        id: &ConversationId,
        staff_uid: &str,
        event: Event,
    ) -> Result<(Document, TransferRequest), BarangayError> {
        let action = event.verb();
        self.require_staff(staff_uid, action).await?;
        let (doc, conversation) = self.load(id).await?;
        if next_status(conversation.status, event).is_none() {
            return Err(illegal(conversation.status, event));
        }
        match conversation.transfer_awaiting(staff_uid) {
            Some(request) => Ok((doc, request.clone())),
            None if conversation.pending_transfer.is_some()
                && conversation.transfer_status == Some(TransferStatus::Pending) =>
            {
                Err(denied(action, "the transfer is addressed to another staff member"))
            }
            None => Err(illegal(conversation.status, event)),
        }
    }

    fn pending_guards(request: &TransferRequest) -> Vec<Precondition> {
        vec![
            Precondition::equals(fields::PENDING_TRANSFER_TO, request.to.as_str()),
            Precondition::equals(fields::PENDING_TRANSFER_FROM, request.from.as_str()),
            Precondition::equals(fields::TRANSFER_STATUS, TransferStatus::Pending.as_str()),
        ]
    }

    /// Accept a transfer addressed to `staff_uid`.
    pub async fn accept_transfer(
        &self,
        id: &ConversationId,
        staff_uid: &str,
    ) -> Result<TransferOutcome, BarangayError> {
        let (doc, request) = self.pending_for(id, staff_uid, Event::AcceptTransfer).await?;
        let new_owner = request.new_owner().to_string();
        let patch = Patch::new()
            .set(fields::TAKEN_OVER_BY, new_owner.as_str())
            .set(fields::TRANSFER_STATUS, TransferStatus::Accepted.as_str())
            .clear_pending_transfer();
        if !self.swap(id, &doc, Self::pending_guards(&request), patch).await? {
            return Ok(TransferOutcome::Superseded);
        }
        let name = self.staff_name(&new_owner).await;
        self.announce(id, &format!("This conversation was transferred to {name}."))
            .await?;
        info!(conversation_id = %id, new_owner = %new_owner, "transfer accepted");
        Ok(TransferOutcome::Accepted { new_owner })
    }

    /// Reject a transfer addressed to `staff_uid`. Ownership is unchanged.
    pub async fn reject_transfer(
        &self,
        id: &ConversationId,
        staff_uid: &str,
    ) -> Result<TransferOutcome, BarangayError> {
        let (doc, request) = self.pending_for(id, staff_uid, Event::RejectTransfer).await?;
        let patch = Patch::new()
            .set(fields::TRANSFER_STATUS, TransferStatus::Rejected.as_str())
            .clear_pending_transfer();
        if !self.swap(id, &doc, Self::pending_guards(&request), patch).await? {
            return Ok(TransferOutcome::Superseded);
        }
        info!(conversation_id = %id, by = staff_uid, "transfer rejected");
        Ok(TransferOutcome::Rejected)
    }

    /// Mark an active conversation resolved. A blank note uses the default.
    pub async fn resolve(
        &self,
        id: &ConversationId,
        staff_uid: &str,
        note: Option<&str>,
    ) -> Result<(), BarangayError> {
        const ACTION: &str = "resolve";
        let member = self.require_staff(staff_uid, ACTION).await?;
        let (doc, conversation) = self.load(id).await?;
        let Some(next) = next_status(conversation.status, Event::Resolve) else {
            return Err(denied(ACTION, "only active conversations can be resolved"));
        };
        if !conversation.is_owned_by(staff_uid) && !member.role.is_admin() {
            return Err(denied(ACTION, "another staff member is handling this conversation"));
        }

        let note = match note.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.config.default_resolution_note.clone(),
        };
        let patch = Patch::new()
            .status(next)
            .set(fields::RESOLVED_BY, staff_uid)
            .set(fields::RESOLVED_AT, timestamp_value(self.store.server_timestamp()))
            .set(fields::RESOLUTION_NOTE, note.as_str())
            .set(fields::UNREAD_STAFF, false)
            .clear(fields::TAKEN_OVER_BY)
            .clear(fields::TRANSFER_STATUS)
            .clear_pending_transfer();
        // A non-admin resolves only while still the owner.
        let guards = if member.role.is_admin() {
            Vec::new()
        } else {
            vec![Precondition::equals(fields::TAKEN_OVER_BY, staff_uid)]
        };
        if !self.swap(id, &doc, guards, patch).await? {
            let (_, now) = self.load(id).await?;
            if now.status != conversation.status {
                return Err(illegal(now.status, Event::Resolve));
            }
            return Err(denied(ACTION, "another staff member is handling this conversation"));
        }
        self.announce(id, &format!("{} marked this conversation as resolved.", member.display_name))
            .await?;
        info!(conversation_id = %id, by = staff_uid, "conversation resolved");
        Ok(())
    }

    /// Reopen a resolved conversation. Allowed for admins and the staff
    /// member who resolved it; the reopener becomes the owner.
    pub async fn reopen(&self, id: &ConversationId, staff_uid: &str) -> Result<(), BarangayError> {
        const ACTION: &str = "reopen";
        let member = self.require_staff(staff_uid, ACTION).await?;
        let (doc, conversation) = self.load(id).await?;
        let Some(next) = next_status(conversation.status, Event::Reopen) else {
            return Err(illegal(conversation.status, Event::Reopen));
        };
        let resolver = conversation.resolution.as_ref().map(|r| r.by.as_str());
        if member.role != StaffRole::Admin && resolver != Some(staff_uid) {
            return Err(denied(ACTION, "only an admin or the staff member who resolved it can reopen"));
        }

        let patch = Patch::new()
            .status(next)
            .set(fields::TAKEN_OVER_BY, staff_uid)
            .clear_resolution();
        let guards = if member.role == StaffRole::Admin {
            Vec::new()
        } else {
            vec![Precondition::equals(fields::RESOLVED_BY, staff_uid)]
        };
        if !self.swap(id, &doc, guards, patch).await? {
            let (_, now) = self.load(id).await?;
            if now.status != conversation.status {
                return Err(illegal(now.status, Event::Reopen));
            }
            return Err(denied(ACTION, "only an admin or the staff member who resolved it can reopen"));
        }
        self.announce(id, &format!("{} reopened this conversation.", member.display_name))
            .await?;
        info!(conversation_id = %id, by = staff_uid, "conversation reopened");
        Ok(())
    }

    /// Clear the staff unread flag.
    pub async fn mark_read_by_staff(&self, id: &ConversationId, staff_uid: &str) -> Result<(), BarangayError> {
        self.require_staff(staff_uid, "mark as read").await?;
        let (_, conversation) = self.load(id).await?;
        if conversation.unread_staff {
            self.store
                .update_fields(
                    CONVERSATIONS,
                    &id.0,
                    Patch::new().set(fields::UNREAD_STAFF, Value::Bool(false)).into_document(),
                )
                .await?;
        }
        Ok(())
    }
}
