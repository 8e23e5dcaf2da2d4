// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as interval bounds and non-blank boilerplate.

use crate::diagnostic::ConfigError;
use crate::model::{BarangayConfig, StorageBackend};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BarangayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.portal.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "portal.log_level `{}` is not one of {}",
                config.portal.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty for the sqlite backend".to_string(),
        });
    }

    if !(50..=5000).contains(&config.chat.send_lock_ms) {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat.send_lock_ms must be between 50 and 5000, got {}",
                config.chat.send_lock_ms
            ),
        });
    }

    if config.chat.bot_typing_delay_ms > 10_000 {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat.bot_typing_delay_ms must be at most 10000, got {}",
                config.chat.bot_typing_delay_ms
            ),
        });
    }

    if config.chat.identity_retry_ms < 50 {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat.identity_retry_ms must be at least 50, got {}",
                config.chat.identity_retry_ms
            ),
        });
    }

    if config.chat.subscription_buffer < 1 {
        errors.push(ConfigError::Validation {
            message: "chat.subscription_buffer must be at least 1".to_string(),
        });
    }

    if config.chat.default_resolution_note.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "chat.default_resolution_note must not be blank".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = BarangayConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_for_sqlite_only() {
        let mut config = BarangayConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));

        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn send_lock_bounds() {
        let mut config = BarangayConfig::default();
        config.chat.send_lock_ms = 10;
        assert!(has_error(&validate_config(&config).unwrap_err(), "send_lock_ms"));
        config.chat.send_lock_ms = 6000;
        assert!(has_error(&validate_config(&config).unwrap_err(), "send_lock_ms"));
        config.chat.send_lock_ms = 300;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = BarangayConfig::default();
        config.portal.log_level = "loud".to_string();
        config.chat.identity_retry_ms = 0;
        config.chat.subscription_buffer = 0;
        config.chat.default_resolution_note = String::new();
        config.chat.bot_typing_delay_ms = 60_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(has_error(&errors, "log_level"));
        assert!(has_error(&errors, "identity_retry_ms"));
        assert!(has_error(&errors, "subscription_buffer"));
        assert!(has_error(&errors, "default_resolution_note"));
        assert!(has_error(&errors, "bot_typing_delay_ms"));
    }

    #[test]
    fn chat_section_deny_unknown_fields() {
        let toml_str = r#"
[chat]
send_lock_ms = 400
debounce = true
"#;
        assert!(toml::from_str::<BarangayConfig>(toml_str).is_err());
    }
}
