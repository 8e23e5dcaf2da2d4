// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Store adapters extend the [`PluginAdapter`] base trait. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod identity;
pub mod store;

pub use adapter::PluginAdapter;
pub use directory::{ResidentDirectory, StaffDirectory};
pub use identity::IdentityProvider;
pub use store::DocumentStore;
