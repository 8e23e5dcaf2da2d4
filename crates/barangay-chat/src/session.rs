// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps a signed-in resident to their one open conversation.

use std::sync::Arc;
use std::time::Duration;

use barangay_core::{
    BarangayError, Conversation, ConversationId, DocumentStore, Filter, Identity,
    IdentityProvider, Query, ResidentDirectory,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::records::{self, CONVERSATIONS, conversation_from_document, fields};

/// Finds or creates the resident's open conversation.
///
/// Check-then-create is not atomic: two clients resolving for the same
/// resident at the same instant can each create a conversation.
pub struct SessionResolver {
    store: Arc<dyn DocumentStore>,
    residents: Arc<dyn ResidentDirectory>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn DocumentStore>, residents: Arc<dyn ResidentDirectory>) -> Self {
        Self { store, residents }
    }

    /// The resident's newest conversation that is not resolved, if any.
    pub async fn find_open(&self, resident: &Identity) -> Result<Option<Conversation>, BarangayError> {
        let query = Query::new().filter(Filter::eq(fields::RESIDENT_ID, resident.uid.as_str()));
        let open = self
            .store
            .query_documents(CONVERSATIONS, &query)
            .await?
            .iter()
            .map(|r| conversation_from_document(&r.id, &r.data))
            .filter(|c| !c.status.is_terminal())
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(open)
    }

    /// Return the open conversation id, creating one in `bot` status if the
    /// resident has none.
    pub async fn resolve_session(&self, resident: &Identity) -> Result<ConversationId, BarangayError> {
        if let Some(existing) = self.find_open(resident).await? {
            debug!(conversation_id = %existing.id, status = %existing.status, "reusing open conversation");
            return Ok(existing.id);
        }

        let name = self.display_name(resident).await;
        let data = records::new_conversation(resident, &name, self.store.server_timestamp());
        let id = ConversationId(self.store.create_document(CONVERSATIONS, data).await?);
        info!(conversation_id = %id, resident = %resident.uid, "conversation created");
        Ok(id)
    }

    /// Profile name, else email local-part, else uid.
    async fn display_name(&self, resident: &Identity) -> String {
        match self.residents.profile(&resident.uid).await {
            Ok(Some(profile)) => {
                if let Some(name) = profile.display_name() {
                    return name;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, resident = %resident.uid, "profile lookup failed, using email"),
        }
        resident.local_part().to_string()
    }
}

/// Wait until auth settles on an identity.
///
/// Re-polls `provider` every `retry` and also wakes on identity changes.
/// Returns `None` only when `cancel` fires.
pub async fn wait_for_identity(
    provider: &dyn IdentityProvider,
    retry: Duration,
    cancel: &CancellationToken,
) -> Option<Identity> {
    let mut changes = provider.watch();
    loop {
        if let Some(identity) = provider.current_identity() {
            return Some(identity);
        }
        debug!(retry_ms = retry.as_millis() as u64, "no identity yet, waiting");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(retry) => {}
            changed = changes.changed() => {
                if changed.is_err() {
                    // Sender gone; polling remains the only signal.
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(retry) => {}
                    }
                }
            }
        }
    }
}
