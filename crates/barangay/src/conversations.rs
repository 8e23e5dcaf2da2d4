// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `barangay conversations` command implementation.

use std::io::IsTerminal;

use barangay_chat::records::{CONVERSATIONS, conversation_from_document};
use barangay_config::model::BarangayConfig;
use barangay_core::{
    BarangayError, Conversation, ConversationStatus, DocumentRecord, DocumentStore, PluginAdapter,
    Query,
};
use colored::Colorize;
use serde::Serialize;

/// One row of `--json` output.
#[derive(Debug, Serialize, PartialEq)]
pub struct ConversationRow {
    pub id: String,
    pub resident: String,
    pub status: ConversationStatus,
    pub owner: Option<String>,
    pub pending_transfer_to: Option<String>,
    pub unread_staff: bool,
    pub last_message: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Conversation> for ConversationRow {
    fn from(c: Conversation) -> Self {
        let updated_at = c
            .last_message
            .as_ref()
            .and_then(|m| m.at)
            .or(c.created_at)
            .map(|t| t.to_rfc3339());
        Self {
            id: c.id.0,
            resident: if c.resident_name.is_empty() {
                c.resident_email
            } else {
                c.resident_name
            },
            status: c.status,
            owner: c.taken_over_by,
            pending_transfer_to: c.pending_transfer.map(|t| t.to),
            unread_staff: c.unread_staff,
            last_message: c.last_message.map(|m| m.text),
            updated_at,
        }
    }
}

fn parse_status(raw: &str) -> Result<ConversationStatus, BarangayError> {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| BarangayError::InputRejected(format!("unknown status `{raw}`")))
}

/// Normalize, filter, and order newest first.
pub fn rows(records: &[DocumentRecord], status: Option<ConversationStatus>) -> Vec<ConversationRow> {
    let mut rows: Vec<ConversationRow> = records
        .iter()
        .map(|r| conversation_from_document(&r.id, &r.data))
        .filter(|c| status.is_none_or(|s| c.status == s))
        .map(ConversationRow::from)
        .collect();
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    rows
}

pub async fn run_conversations(
    config: &BarangayConfig,
    status: Option<&str>,
    json: bool,
) -> Result<(), BarangayError> {
    let status = status.map(parse_status).transpose()?;
    let store = barangay_storage::open_store(&config.storage, config.chat.subscription_buffer).await?;
    let records = store.query_documents(CONVERSATIONS, &Query::new()).await?;
    let rows = rows(&records, status);

    if json {
        let text = serde_json::to_string_pretty(&rows)
            .map_err(|e| BarangayError::Internal(format!("failed to render JSON: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    let color = std::io::stdout().is_terminal();
    if rows.is_empty() {
        println!("no conversations");
    }
    for row in &rows {
        let status = match (color, row.status) {
            (false, s) => s.to_string().normal(),
            (true, ConversationStatus::Waiting) => "waiting".yellow().bold(),
            (true, ConversationStatus::Active) => "active".green(),
            (true, ConversationStatus::Resolved) => "resolved".dimmed(),
            (true, ConversationStatus::Bot) => "bot".cyan(),
        };
        println!(
            "{:<34} {:<9} {:<24} {:<12} {}",
            row.id,
            status,
            row.resident,
            row.owner.as_deref().unwrap_or("-"),
            row.last_message.as_deref().unwrap_or(""),
        );
    }
    store.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, value: serde_json::Value) -> DocumentRecord {
        DocumentRecord::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn legacy_closed_matches_resolved_filter() {
        let records = vec![
            record("a", json!({"status": "closed", "residentEmail": "a@x.ph"})),
            record("b", json!({"status": "waiting", "residentName": "Juan Cruz"})),
        ];
        let resolved = rows(&records, Some(ConversationStatus::Resolved));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].resident, "a@x.ph");
        assert_eq!(rows(&records, None).len(), 2);
    }

    #[test]
    fn status_parsing_accepts_aliases() {
        assert_eq!(parse_status("Closed").unwrap(), ConversationStatus::Resolved);
        assert!(parse_status("pending").is_err());
    }

    #[test]
    fn json_uses_canonical_status() {
        let row = rows(&[record("a", json!({"status": "closed"}))], None).remove(0);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["status"], "resolved");
    }
}
