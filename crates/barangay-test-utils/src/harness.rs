// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end chat flows.
//!
//! `TestHarness` wires a store, fake directories, the coordinator, and the
//! session resolver together. The store is in-memory by default or a SQLite
//! file in a temp directory that lives as long as the harness.

use std::sync::Arc;

use barangay_bot::BotResponder;
use barangay_chat::{EscalationCoordinator, ResidentChatView, SessionResolver, StaffConsole};
use barangay_config::model::{BotConfig, ChatConfig, StorageBackend, StorageConfig};
use barangay_core::{BarangayError, ConversationId, DocumentStore, Identity, StaffRole};
use barangay_storage::{MemoryStore, SqliteStore};

use crate::directory::{MockResidentDirectory, MockStaffDirectory};
use crate::flaky_store::FlakyStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    chat: ChatConfig,
    bot: BotConfig,
    sqlite: bool,
    flaky: bool,
    staff: Vec<(String, String, StaffRole)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            chat: ChatConfig {
                // Tests that care about the delay use a paused clock.
                bot_typing_delay_ms: 0,
                ..ChatConfig::default()
            },
            bot: BotConfig::default(),
            sqlite: false,
            flaky: false,
            staff: Vec::new(),
        }
    }

    pub fn with_chat_config(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_typing_delay_ms(mut self, ms: u64) -> Self {
        self.chat.bot_typing_delay_ms = ms;
        self
    }

    pub fn with_conditional_claim(mut self, enabled: bool) -> Self {
        self.chat.conditional_claim = enabled;
        self
    }

    /// Run against a SQLite file instead of the memory store.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Wrap the store in a [`FlakyStore`].
    pub fn with_flaky_store(mut self) -> Self {
        self.flaky = true;
        self
    }

    pub fn with_staff(mut self, uid: &str, display_name: &str) -> Self {
        self.staff
            .push((uid.to_string(), display_name.to_string(), StaffRole::Staff));
        self
    }

    pub fn with_admin(mut self, uid: &str, display_name: &str) -> Self {
        self.staff
            .push((uid.to_string(), display_name.to_string(), StaffRole::Admin));
        self
    }

    pub async fn build(self) -> Result<TestHarness, BarangayError> {
        let (base, temp_dir): (Arc<dyn DocumentStore>, _) = if self.sqlite {
            let temp_dir =
                tempfile::TempDir::new().map_err(|e| BarangayError::Storage { source: e.into() })?;
            let config = StorageConfig {
                backend: StorageBackend::Sqlite,
                database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
                wal_mode: true,
            };
            let store = SqliteStore::open(&config)
                .await?
                .with_subscription_buffer(self.chat.subscription_buffer);
            (Arc::new(store) as Arc<dyn DocumentStore>, Some(temp_dir))
        } else {
            let store = MemoryStore::with_subscription_buffer(self.chat.subscription_buffer);
            (Arc::new(store) as Arc<dyn DocumentStore>, None)
        };

        let flaky = self.flaky.then(|| Arc::new(FlakyStore::new(base.clone())));
        let store: Arc<dyn DocumentStore> = match &flaky {
            Some(f) => f.clone() as Arc<dyn DocumentStore>,
            None => base,
        };

        let staff = Arc::new(MockStaffDirectory::new());
        for (uid, name, role) in &self.staff {
            staff.add(uid, name, *role);
        }
        let residents = Arc::new(MockResidentDirectory::new());

        let coordinator = Arc::new(EscalationCoordinator::new(
            store.clone(),
            staff.clone(),
            BotResponder::new(self.bot),
            self.chat,
        ));
        let sessions = Arc::new(SessionResolver::new(store.clone(), residents.clone()));

        Ok(TestHarness {
            store,
            flaky,
            staff,
            residents,
            coordinator,
            sessions,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete chat desk over a fresh store.
pub struct TestHarness {
    pub store: Arc<dyn DocumentStore>,
    /// Present when built with [`TestHarnessBuilder::with_flaky_store`].
    pub flaky: Option<Arc<FlakyStore>>,
    pub staff: Arc<MockStaffDirectory>,
    pub residents: Arc<MockResidentDirectory>,
    pub coordinator: Arc<EscalationCoordinator>,
    pub sessions: Arc<SessionResolver>,
    /// Kept alive so the SQLite file outlives the harness.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A resident identity with a matching email.
    pub fn resident(uid: &str) -> Identity {
        Identity::new(uid, format!("{uid}@residents.example.ph"))
    }

    pub async fn resident_view(&self, identity: Identity) -> Result<ResidentChatView, BarangayError> {
        ResidentChatView::attach(self.coordinator.clone(), self.sessions.clone(), identity, true).await
    }

    pub async fn staff_console(&self, uid: &str) -> Result<StaffConsole, BarangayError> {
        StaffConsole::sign_in(self.coordinator.clone(), uid).await
    }

    /// Create a conversation for `resident` and push it into the staff queue.
    pub async fn waiting_conversation(&self, resident: &Identity) -> Result<ConversationId, BarangayError> {
        let id = self.sessions.resolve_session(resident).await?;
        self.coordinator.accept_escalation_offer(&id, resident).await?;
        Ok(id)
    }

    /// A waiting conversation claimed by `staff_uid`.
    pub async fn active_conversation(
        &self,
        resident: &Identity,
        staff_uid: &str,
    ) -> Result<ConversationId, BarangayError> {
        let id = self.waiting_conversation(resident).await?;
        self.coordinator.claim(&id, staff_uid).await?;
        Ok(id)
    }
}
