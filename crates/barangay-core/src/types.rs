// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the chat desk and its adapters.
//!
//! The stored representation of `status`, `sender`, and the transfer fields is
//! loosely typed. The `normalize` constructors here are the only place raw
//! strings are interpreted; legacy aliases are collapsed immediately.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::timestamp::Timestamp;

/// Store-assigned identifier of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        ConversationId(s.to_string())
    }
}

/// Store-assigned identifier of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Identity,
    Directory,
}

/// Handling status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Answered by the rule-based bot.
    Bot,
    /// Queued for any staff member to claim.
    Waiting,
    /// Owned by one staff member.
    Active,
    /// Handled. Terminal, but reopenable.
    #[strum(to_string = "resolved", serialize = "closed")]
    #[serde(alias = "closed")]
    Resolved,
}

impl ConversationStatus {
    /// Interpret a stored status.
    ///
    /// `closed` is the legacy spelling of `resolved`. A missing or unknown
    /// value falls back to `bot`, the status with the fewest capabilities.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or(ConversationStatus::Bot)
    }

    /// The canonical stored spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Bot => "bot",
            ConversationStatus::Waiting => "waiting",
            ConversationStatus::Active => "active",
            ConversationStatus::Resolved => "resolved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStatus::Resolved)
    }
}

/// Author class of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The resident. Text is always rendered literally.
    User,
    Bot,
    Staff,
    System,
}

impl Sender {
    /// Interpret a stored sender. Unknown senders are treated as residents so
    /// their text is never rendered as markup.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or(Sender::User)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
            Sender::Staff => "staff",
            Sender::System => "system",
        }
    }

    /// Whether the text is pre-approved markup.
    pub fn is_trusted_markup(&self) -> bool {
        !matches!(self, Sender::User)
    }
}

/// State of an ownership handshake.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TransferStatus {
    pub fn normalize(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Accepted => "accepted",
            TransferStatus::Rejected => "rejected",
        }
    }
}

/// Direction of an ownership handshake.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// The owner hands the conversation to the target.
    Handoff,
    /// A non-owner asks the owner for the conversation.
    Takeover,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Handoff => "handoff",
            TransferKind::Takeover => "takeover",
        }
    }
}

/// An in-flight ownership handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// The staff member who must accept or reject.
    pub to: String,
    /// The staff member who asked.
    pub from: String,
    pub kind: TransferKind,
    pub reason: Option<String>,
}

impl TransferRequest {
    /// Who owns the conversation if the request is accepted.
    pub fn new_owner(&self) -> &str {
        match self.kind {
            TransferKind::Handoff => &self.to,
            TransferKind::Takeover => &self.from,
        }
    }
}

/// Denormalized preview of the latest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender: Sender,
    pub at: Option<Timestamp>,
}

/// Resolution details shown on the terminal summary card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub by: String,
    pub at: Option<Timestamp>,
    pub note: String,
}

/// One resident-initiated support thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub resident_id: String,
    pub resident_email: String,
    pub resident_name: String,
    pub status: ConversationStatus,
    pub taken_over_by: Option<String>,
    pub pending_transfer: Option<TransferRequest>,
    pub transfer_status: Option<TransferStatus>,
    pub resolution: Option<Resolution>,
    pub unread_staff: bool,
    pub unread_resident: bool,
    pub last_message: Option<LastMessage>,
    pub created_at: Option<Timestamp>,
}

impl Conversation {
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.taken_over_by.as_deref() == Some(uid)
    }

    /// Whether a staff member may append a reply right now.
    pub fn permits_staff_reply(&self, uid: &str, role: StaffRole) -> bool {
        self.status == ConversationStatus::Active && (self.is_owned_by(uid) || role.is_admin())
    }

    /// The pending transfer addressed to `uid`, if any.
    pub fn transfer_awaiting(&self, uid: &str) -> Option<&TransferRequest> {
        self.pending_transfer
            .as_ref()
            .filter(|t| t.to == uid && self.transfer_status == Some(TransferStatus::Pending))
    }
}

/// One immutable entry of a conversation's message sub-collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub message: String,
    pub sender: Sender,
    /// Store-assigned ordering instant. `None` only for malformed entries.
    pub timestamp: Option<Timestamp>,
    /// Set on bot replies that carry the talk-to-staff offer.
    pub escalation_offer: bool,
}

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }

    /// The part of the email before `@`, or the uid when there is no email.
    pub fn local_part(&self) -> &str {
        match self.email.split('@').next() {
            Some(local) if !local.trim().is_empty() => local,
            _ => &self.uid,
        }
    }
}

/// Staff membership level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Staff,
    Admin,
}

impl StaffRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, StaffRole::Admin)
    }
}

/// A staff directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub uid: String,
    pub display_name: String,
    pub role: StaffRole,
}

/// The parts of a resident profile the chat desk reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ResidentProfile {
    /// "First Last", or whichever part is present. `None` if both are blank.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A message surfaced to the actor of a failed or noteworthy action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_resolved() {
        assert_eq!(
            ConversationStatus::normalize(Some("closed")),
            ConversationStatus::Resolved
        );
        assert_eq!(
            ConversationStatus::normalize(Some("Resolved")),
            ConversationStatus::Resolved
        );
        assert_eq!(ConversationStatus::Resolved.to_string(), "resolved");
    }

    #[test]
    fn missing_or_unknown_status_defaults_to_bot() {
        assert_eq!(ConversationStatus::normalize(None), ConversationStatus::Bot);
        assert_eq!(
            ConversationStatus::normalize(Some("escalated")),
            ConversationStatus::Bot
        );
    }

    #[test]
    fn serde_accepts_legacy_alias() {
        let s: ConversationStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(s, ConversationStatus::Resolved);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"resolved\"");
    }

    #[test]
    fn unknown_sender_is_untrusted() {
        assert_eq!(Sender::normalize(Some("moderator")), Sender::User);
        assert!(!Sender::normalize(None).is_trusted_markup());
        assert!(Sender::normalize(Some("staff")).is_trusted_markup());
    }

    #[test]
    fn transfer_new_owner_depends_on_kind() {
        let handoff = TransferRequest {
            to: "s2".into(),
            from: "s1".into(),
            kind: TransferKind::Handoff,
            reason: None,
        };
        assert_eq!(handoff.new_owner(), "s2");
        let takeover = TransferRequest {
            kind: TransferKind::Takeover,
            ..handoff
        };
        assert_eq!(takeover.new_owner(), "s1");
    }

    #[test]
    fn local_part_falls_back_to_uid() {
        assert_eq!(Identity::new("u1", "juan@example.ph").local_part(), "juan");
        assert_eq!(Identity::new("u1", "").local_part(), "u1");
        assert_eq!(Identity::new("u1", "@example.ph").local_part(), "u1");
    }

    #[test]
    fn profile_display_name() {
        let full = ResidentProfile {
            first_name: Some("Maria".into()),
            last_name: Some("Santos".into()),
        };
        assert_eq!(full.display_name().as_deref(), Some("Maria Santos"));
        let blank = ResidentProfile {
            first_name: Some("  ".into()),
            last_name: None,
        };
        assert_eq!(blank.display_name(), None);
    }
}
