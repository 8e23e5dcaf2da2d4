// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Barangay chat desk integration tests.
//!
//! Provides fake adapters and a harness for fast, deterministic tests
//! without a real auth service or store server.
//!
//! # Components
//!
//! - [`MockIdentity`] - Sign-in state that tests flip at will
//! - [`MockStaffDirectory`] / [`MockResidentDirectory`] - In-memory directories
//! - [`FlakyStore`] - A store wrapper that fails on demand
//! - [`TestHarness`] - The whole stack over a fresh store

pub mod directory;
pub mod flaky_store;
pub mod harness;
pub mod identity;

pub use directory::{MockResidentDirectory, MockStaffDirectory};
pub use flaky_store::FlakyStore;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use identity::MockIdentity;
