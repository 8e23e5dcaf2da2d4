// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Barangay chat desk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BarangayConfig {
    /// Office identity and logging.
    #[serde(default)]
    pub portal: PortalConfig,

    /// Document store backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat escalation behavior.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Office details interpolated into bot replies.
    #[serde(default)]
    pub bot: BotConfig,
}

/// Office identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PortalConfig {
    /// Display name of the office.
    #[serde(default = "default_portal_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            name: default_portal_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_portal_name() -> String {
    "Barangay Hall".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which document store adapter to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process, non-durable. Useful for demos and tests.
    Memory,
    /// SQLite file at `database_path`.
    #[default]
    Sqlite,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("barangay").join("barangay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("barangay.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Chat escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// How long staff sending stays locked after a submit, in milliseconds.
    #[serde(default = "default_send_lock_ms")]
    pub send_lock_ms: u64,

    /// Simulated typing delay before a bot reply, in milliseconds.
    #[serde(default = "default_bot_typing_delay_ms")]
    pub bot_typing_delay_ms: u64,

    /// Re-poll interval while waiting for auth to produce an identity.
    #[serde(default = "default_identity_retry_ms")]
    pub identity_retry_ms: u64,

    /// Note used when staff resolve a conversation without typing one.
    #[serde(default = "default_resolution_note")]
    pub default_resolution_note: String,

    /// Claim with a compare-and-swap on `status == waiting`.
    ///
    /// When false, claims are unconditional and the last writer wins.
    #[serde(default = "default_conditional_claim")]
    pub conditional_claim: bool,

    /// Buffered change events per live subscription.
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            send_lock_ms: default_send_lock_ms(),
            bot_typing_delay_ms: default_bot_typing_delay_ms(),
            identity_retry_ms: default_identity_retry_ms(),
            default_resolution_note: default_resolution_note(),
            conditional_claim: default_conditional_claim(),
            subscription_buffer: default_subscription_buffer(),
        }
    }
}

fn default_send_lock_ms() -> u64 {
    500
}

fn default_bot_typing_delay_ms() -> u64 {
    800
}

fn default_identity_retry_ms() -> u64 {
    1000
}

fn default_resolution_note() -> String {
    "Your concern has been resolved. Thank you for contacting the Barangay office.".to_string()
}

fn default_conditional_claim() -> bool {
    true
}

fn default_subscription_buffer() -> usize {
    64
}

/// Office details used by the bot's canned replies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default = "default_office_hours")]
    pub office_hours: String,

    #[serde(default = "default_contact_phone")]
    pub contact_phone: String,

    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    #[serde(default = "default_office_address")]
    pub office_address: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            office_hours: default_office_hours(),
            contact_phone: default_contact_phone(),
            contact_email: default_contact_email(),
            office_address: default_office_address(),
        }
    }
}

fn default_office_hours() -> String {
    "Monday to Friday, 8:00 AM to 5:00 PM".to_string()
}

fn default_contact_phone() -> String {
    "(02) 8123-4567".to_string()
}

fn default_contact_email() -> String {
    "barangay.office@example.ph".to_string()
}

fn default_office_address() -> String {
    "Barangay Hall, Main Street".to_string()
}
