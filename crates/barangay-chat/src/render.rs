// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rendering for chat views.

use std::cmp::Ordering;

use barangay_core::{Message, MessageId, Sender, Timestamp};

/// Escape text for literal display inside HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub sender: Sender,
    /// Display markup. Resident text is always escaped.
    pub html: String,
    /// The stored text, for renderers that do not interpret markup.
    pub text: String,
    pub timestamp: Option<Timestamp>,
    /// Show the talk-to-staff affordance under this bubble.
    pub escalation_offer: bool,
}

impl RenderedMessage {
    pub fn from_message(message: Message) -> Self {
        let html = if message.sender.is_trusted_markup() {
            message.message.clone()
        } else {
            escape_html(&message.message)
        };
        Self {
            id: message.id,
            sender: message.sender,
            html,
            text: message.message,
            timestamp: message.timestamp,
            escalation_offer: message.escalation_offer,
        }
    }

    /// Display order: timestamp ascending, unstamped last, then id.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        let by_time = match (self.timestamp, other.timestamp) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_time.then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: Sender, text: &str) -> Message {
        Message {
            id: MessageId("m".into()),
            message: text.into(),
            sender,
            timestamp: None,
            escalation_offer: false,
        }
    }

    #[test]
    fn resident_markup_is_literal() {
        let r = RenderedMessage::from_message(msg(Sender::User, "<b>x</b>"));
        assert_eq!(r.html, "&lt;b&gt;x&lt;/b&gt;");
        assert_eq!(r.text, "<b>x</b>");
    }

    #[test]
    fn staff_markup_passes_through() {
        let r = RenderedMessage::from_message(msg(Sender::Staff, "<b>x</b>"));
        assert_eq!(r.html, "<b>x</b>");
    }

    #[test]
    fn escapes_quotes_and_ampersands() {
        assert_eq!(escape_html(r#"a & "b" 'c'"#), "a &amp; &quot;b&quot; &#39;c&#39;");
    }
}
