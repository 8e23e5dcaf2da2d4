// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Barangay chat desk.

use thiserror::Error;

use crate::types::{Notice, NoticeKind};

/// The primary error type used across all adapter traits and chat operations.
#[derive(Debug, Error)]
pub enum BarangayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store backend errors (connection failure, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The referenced document no longer exists.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The actor is not entitled to perform the action.
    #[error("permission denied for {action}: {reason}")]
    PermissionDenied { action: String, reason: String },

    /// The action is not legal from the conversation's current status.
    #[error("cannot {action} a conversation in status `{from}`")]
    InvalidTransition { from: String, action: String },

    /// Input refused at the boundary instead of being recorded.
    #[error("input rejected: {0}")]
    InputRejected(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BarangayError {
    /// Wraps any error (or message) as a transient store failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        BarangayError::Storage {
            source: source.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        BarangayError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn permission_denied(action: impl Into<String>, reason: impl Into<String>) -> Self {
        BarangayError::PermissionDenied {
            action: action.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(from: impl std::fmt::Display, action: impl Into<String>) -> Self {
        BarangayError::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }

    /// True for failures the user may retry by re-triggering the action.
    pub fn is_transient(&self) -> bool {
        matches!(self, BarangayError::Storage { .. })
    }

    /// True when the caller should refresh its conversation list.
    pub fn requires_refresh(&self) -> bool {
        matches!(self, BarangayError::NotFound { .. })
    }

    /// Converts the error into the notice shown to the actor.
    ///
    /// Store failures never leak their source text to the user; the detail
    /// is logged where the error is caught.
    pub fn notice(&self) -> Notice {
        match self {
            BarangayError::PermissionDenied { reason, .. } => Notice {
                kind: NoticeKind::Warning,
                text: format!("You can't do that: {reason}."),
            },
            BarangayError::InvalidTransition { from, action } => Notice {
                kind: NoticeKind::Warning,
                text: format!("This conversation is {from}; it can't {action} right now."),
            },
            BarangayError::NotFound { .. } => Notice {
                kind: NoticeKind::Warning,
                text: "This conversation no longer exists. The list has been refreshed.".into(),
            },
            BarangayError::InputRejected(reason) => Notice {
                kind: NoticeKind::Info,
                text: reason.clone(),
            },
            BarangayError::Storage { .. } => Notice {
                kind: NoticeKind::Error,
                text: "Something went wrong. Please try again.".into(),
            },
            BarangayError::Config(_) | BarangayError::Internal(_) => Notice {
                kind: NoticeKind::Error,
                text: "Unexpected error. Please contact the office administrator.".into(),
            },
        }
    }
}
