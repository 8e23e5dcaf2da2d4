// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned-reply bot for residents chatting before escalation.
//!
//! [`BotResponder`] is a pure function of the message text: it lower-cases
//! the input and walks an ordered topic table, first match wins. Unmatched
//! input gets the fallback reply bundled with an offer to reach staff. The
//! responder never changes conversation status; accepting the offer is a
//! separate resident action.

pub mod responder;
pub mod topics;

pub use responder::{BotReply, BotResponder};
pub use topics::Topic;
