// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation status transitions.
//!
//! `bot -> waiting -> active -> resolved`, with `resolved -> active` on
//! reopen. Replies and transfer steps keep a conversation `active`. Nothing
//! else is an edge.

use barangay_core::ConversationStatus;

/// An event that may move a conversation between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The resident accepted the talk-to-staff offer.
    Escalate,
    Claim,
    StaffReply,
    RequestTransfer,
    AcceptTransfer,
    RejectTransfer,
    Resolve,
    Reopen,
}

impl Event {
    pub const ALL: [Event; 8] = [
        Event::Escalate,
        Event::Claim,
        Event::StaffReply,
        Event::RequestTransfer,
        Event::AcceptTransfer,
        Event::RejectTransfer,
        Event::Resolve,
        Event::Reopen,
    ];

    /// Verb used in notices, e.g. "cannot claim a conversation in status `bot`".
    pub fn verb(&self) -> &'static str {
        match self {
            Event::Escalate => "escalate",
            Event::Claim => "claim",
            Event::StaffReply => "reply to",
            Event::RequestTransfer => "request a transfer of",
            Event::AcceptTransfer => "accept a transfer of",
            Event::RejectTransfer => "reject a transfer of",
            Event::Resolve => "resolve",
            Event::Reopen => "reopen",
        }
    }
}

/// The status after `event`, or `None` if `event` is not legal from `from`.
pub fn next_status(from: ConversationStatus, event: Event) -> Option<ConversationStatus> {
    use ConversationStatus::*;
    match (from, event) {
        (Bot, Event::Escalate) => Some(Waiting),
        (Waiting, Event::Claim) => Some(Active),
        (
            Active,
            Event::StaffReply
            | Event::RequestTransfer
            | Event::AcceptTransfer
            | Event::RejectTransfer,
        ) => Some(Active),
        (Active, Event::Resolve) => Some(Resolved),
        (Resolved, Event::Reopen) => Some(Active),
        _ => None,
    }
}
