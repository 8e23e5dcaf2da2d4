// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored field names and the typed view of conversation documents.
//!
//! Every raw document read by this crate passes through
//! [`conversation_from_document`] or [`message_from_record`]; nothing past
//! this module looks at raw strings or timestamp shapes.

use barangay_core::{
    Conversation, ConversationId, ConversationStatus, Document, DocumentRecord, Identity,
    LastMessage, Message, MessageId, Resolution, Sender, Timestamp, TransferKind,
    TransferRequest, TransferStatus, normalize_timestamp, timestamp_value,
};
use serde_json::{Value, json};

pub const CONVERSATIONS: &str = "conversations";
pub const MESSAGES: &str = "messages";
pub const STAFF: &str = "staff";
pub const RESIDENTS: &str = "residents";

/// Conversation document fields.
pub mod fields {
    pub const RESIDENT_ID: &str = "residentId";
    pub const RESIDENT_EMAIL: &str = "residentEmail";
    pub const RESIDENT_NAME: &str = "residentName";
    pub const STATUS: &str = "status";
    pub const TAKEN_OVER_BY: &str = "takenOverBy";
    pub const PENDING_TRANSFER_TO: &str = "pendingTransferTo";
    pub const PENDING_TRANSFER_FROM: &str = "pendingTransferFrom";
    pub const TRANSFER_STATUS: &str = "transferStatus";
    pub const TRANSFER_KIND: &str = "transferKind";
    pub const TRANSFER_REASON: &str = "transferReason";
    pub const RESOLVED_BY: &str = "resolvedBy";
    pub const RESOLVED_AT: &str = "resolvedAt";
    pub const RESOLUTION_NOTE: &str = "resolutionNote";
    pub const UNREAD_STAFF: &str = "unreadStaff";
    pub const UNREAD_RESIDENT: &str = "unreadResident";
    pub const LAST_MESSAGE: &str = "lastMessage";
    pub const CREATED_AT: &str = "createdAt";

    // Message entry fields.
    pub const MESSAGE: &str = "message";
    pub const SENDER: &str = "sender";
    pub const TIMESTAMP: &str = "timestamp";
    pub const ESCALATION_OFFER: &str = "escalationOffer";

    // Directory fields.
    pub const DISPLAY_NAME: &str = "displayName";
    pub const ROLE: &str = "role";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
}

fn str_field<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn owned(doc: &Document, key: &str) -> Option<String> {
    str_field(doc, key).map(str::to_string)
}

fn flag(doc: &Document, key: &str) -> bool {
    doc.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// The raw stored status, for compare-and-swap guards.
pub fn raw_status(doc: &Document) -> Value {
    doc.get(fields::STATUS).cloned().unwrap_or(Value::Null)
}

/// Build the typed view of a conversation document.
///
/// Missing or malformed fields fall back to their most restrictive reading.
pub fn conversation_from_document(id: &str, doc: &Document) -> Conversation {
    let transfer_status = TransferStatus::normalize(str_field(doc, fields::TRANSFER_STATUS));
    let pending_transfer = match (
        str_field(doc, fields::PENDING_TRANSFER_TO),
        str_field(doc, fields::PENDING_TRANSFER_FROM),
    ) {
        (Some(to), Some(from)) => Some(TransferRequest {
            to: to.to_string(),
            from: from.to_string(),
            kind: match str_field(doc, fields::TRANSFER_KIND) {
                Some("takeover") => TransferKind::Takeover,
                _ => TransferKind::Handoff,
            },
            reason: owned(doc, fields::TRANSFER_REASON),
        }),
        _ => None,
    };

    let resolution = owned(doc, fields::RESOLVED_BY).map(|by| Resolution {
        by,
        at: doc.get(fields::RESOLVED_AT).and_then(normalize_timestamp),
        note: owned(doc, fields::RESOLUTION_NOTE).unwrap_or_default(),
    });

    let last_message = doc
        .get(fields::LAST_MESSAGE)
        .and_then(Value::as_object)
        .map(|lm| LastMessage {
            text: owned(lm, "text").unwrap_or_default(),
            sender: Sender::normalize(str_field(lm, "sender")),
            at: lm.get("at").and_then(normalize_timestamp),
        });

    Conversation {
        id: ConversationId(id.to_string()),
        resident_id: owned(doc, fields::RESIDENT_ID).unwrap_or_default(),
        resident_email: owned(doc, fields::RESIDENT_EMAIL).unwrap_or_default(),
        resident_name: owned(doc, fields::RESIDENT_NAME).unwrap_or_default(),
        status: ConversationStatus::normalize(str_field(doc, fields::STATUS)),
        taken_over_by: owned(doc, fields::TAKEN_OVER_BY),
        pending_transfer,
        transfer_status,
        resolution,
        unread_staff: flag(doc, fields::UNREAD_STAFF),
        unread_resident: flag(doc, fields::UNREAD_RESIDENT),
        last_message,
        created_at: doc.get(fields::CREATED_AT).and_then(normalize_timestamp),
    }
}

pub fn message_from_record(record: &DocumentRecord) -> Message {
    let doc = &record.data;
    Message {
        id: MessageId(record.id.clone()),
        message: doc
            .get(fields::MESSAGE)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        sender: Sender::normalize(str_field(doc, fields::SENDER)),
        timestamp: doc.get(fields::TIMESTAMP).and_then(normalize_timestamp),
        escalation_offer: flag(doc, fields::ESCALATION_OFFER),
    }
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// A fresh conversation in `bot` status.
pub fn new_conversation(identity: &Identity, resident_name: &str, now: Timestamp) -> Document {
    object(json!({
        fields::RESIDENT_ID: identity.uid,
        fields::RESIDENT_EMAIL: identity.email,
        fields::RESIDENT_NAME: resident_name,
        fields::STATUS: ConversationStatus::Bot.as_str(),
        fields::UNREAD_STAFF: false,
        fields::UNREAD_RESIDENT: false,
        fields::CREATED_AT: timestamp_value(now),
    }))
}

/// A message entry for the `messages` sub-collection.
pub fn message_entry(sender: Sender, text: &str, at: Timestamp, escalation_offer: bool) -> Document {
    let mut doc = object(json!({
        fields::MESSAGE: text,
        fields::SENDER: sender.as_str(),
        fields::TIMESTAMP: timestamp_value(at),
    }));
    if escalation_offer {
        doc.insert(fields::ESCALATION_OFFER.into(), Value::Bool(true));
    }
    doc
}

/// Incrementally built field patch. `clear` writes `null`, which deletes.
#[derive(Debug, Default, Clone)]
pub struct Patch(Document);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn clear(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), Value::Null);
        self
    }

    pub fn status(self, status: ConversationStatus) -> Self {
        self.set(fields::STATUS, status.as_str())
    }

    pub fn last_message(self, sender: Sender, text: &str, at: Timestamp) -> Self {
        self.set(
            fields::LAST_MESSAGE,
            json!({"text": text, "sender": sender.as_str(), "at": timestamp_value(at)}),
        )
    }

    pub fn clear_pending_transfer(self) -> Self {
        self.clear(fields::PENDING_TRANSFER_TO)
            .clear(fields::PENDING_TRANSFER_FROM)
            .clear(fields::TRANSFER_KIND)
            .clear(fields::TRANSFER_REASON)
    }

    pub fn clear_resolution(self) -> Self {
        self.clear(fields::RESOLVED_BY)
            .clear(fields::RESOLVED_AT)
            .clear(fields::RESOLUTION_NOTE)
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(value: Value) -> Document {
        object(value)
    }

    #[test]
    fn legacy_closed_and_seconds_timestamps_normalize() {
        let c = conversation_from_document(
            "c1",
            &doc(json!({
                "residentId": "r1",
                "status": "closed",
                "resolvedBy": "s1",
                "resolvedAt": {"seconds": 1_772_353_800, "nanoseconds": 0},
                "resolutionNote": "fixed",
            })),
        );
        assert_eq!(c.status, ConversationStatus::Resolved);
        let resolution = c.resolution.unwrap();
        assert_eq!(resolution.note, "fixed");
        assert_eq!(
            resolution.at,
            Some(chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn missing_status_reads_as_bot() {
        let c = conversation_from_document("c1", &doc(json!({"residentId": "r1"})));
        assert_eq!(c.status, ConversationStatus::Bot);
        assert!(c.pending_transfer.is_none());
        assert!(!c.unread_staff);
    }

    #[test]
    fn half_written_transfer_is_ignored() {
        let c = conversation_from_document(
            "c1",
            &doc(json!({"status": "active", "pendingTransferTo": "s2", "transferStatus": "pending"})),
        );
        assert!(c.pending_transfer.is_none());
        assert_eq!(c.transfer_status, Some(TransferStatus::Pending));
    }

    #[test]
    fn unknown_sender_is_treated_as_resident() {
        let m = message_from_record(&DocumentRecord::new(
            "m1",
            doc(json!({"message": "<b>hi</b>", "sender": "martian"})),
        ));
        assert_eq!(m.sender, Sender::User);
        assert!(m.timestamp.is_none());
    }

    #[test]
    fn patch_clear_writes_null() {
        let p = Patch::new()
            .status(ConversationStatus::Active)
            .clear_resolution()
            .into_document();
        assert_eq!(p.get("status"), Some(&json!("active")));
        assert_eq!(p.get("resolvedBy"), Some(&Value::Null));
    }
}
