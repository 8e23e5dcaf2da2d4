// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Barangay chat desk.
//!
//! This crate provides the error type, the closed domain enums with their
//! store-boundary normalization, the generic document model, and the adapter
//! traits that storage and identity backends implement.

pub mod document;
pub mod error;
pub mod subscription;
pub mod timestamp;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use document::{
    ChangeEvent, Direction, Document, DocumentRecord, Filter, FilterOp, Precondition, Query,
    SubscriptionTarget,
};
pub use error::BarangayError;
pub use subscription::{Subscription, SubscriptionSender};
pub use timestamp::{Timestamp, normalize_timestamp, timestamp_value};
pub use types::{
    AdapterType, Conversation, ConversationId, ConversationStatus, HealthStatus, Identity,
    LastMessage, Message, MessageId, Notice, NoticeKind, Resolution, ResidentProfile, Sender,
    StaffMember, StaffRole, TransferKind, TransferRequest, TransferStatus,
};

// Re-export all adapter traits at crate root.
pub use traits::{DocumentStore, IdentityProvider, PluginAdapter, ResidentDirectory, StaffDirectory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barangay_error_has_all_variants() {
        let _config = BarangayError::Config("test".into());
        let _storage = BarangayError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _not_found = BarangayError::NotFound {
            collection: "conversations".into(),
            id: "c1".into(),
        };
        let _denied = BarangayError::PermissionDenied {
            action: "send".into(),
            reason: "not the owner".into(),
        };
        let _transition = BarangayError::InvalidTransition {
            from: "bot".into(),
            action: "claim".into(),
        };
        let _input = BarangayError::InputRejected("empty".into());
        let _internal = BarangayError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_document_store<T: DocumentStore>() {}
        fn _assert_identity_provider<T: IdentityProvider>() {}
        fn _assert_staff_directory<T: StaffDirectory>() {}
        fn _assert_resident_directory<T: ResidentDirectory>() {}
    }
}
