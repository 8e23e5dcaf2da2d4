// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./barangay.toml` > `~/.config/barangay/barangay.toml` >
//! `/etc/barangay/barangay.toml` with environment variable overrides via `BARANGAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BarangayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/barangay/barangay.toml` (system-wide)
/// 3. `~/.config/barangay/barangay.toml` (user XDG config)
/// 4. `./barangay.toml` (local directory)
/// 5. `BARANGAY_*` environment variables
pub fn load_config() -> Result<BarangayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BarangayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BarangayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BarangayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BarangayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BarangayConfig::default()))
        .merge(Toml::file("/etc/barangay/barangay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("barangay/barangay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("barangay.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `BARANGAY_CHAT_SEND_LOCK_MS` must map to `chat.send_lock_ms`.
fn env_provider() -> Env {
    Env::prefixed("BARANGAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 4] = ["portal", "storage", "chat", "bot"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
