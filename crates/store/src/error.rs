//! Error types for the store crate.

use thiserror::Error;

use crate::types::{ObjectKey, ResourceKind};

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} '{key}' was modified: expected version {expected}, found {actual}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    #[error("invalid object: {reason}")]
    Invalid { reason: String },

    #[error("expected a {expected}, found a {actual}")]
    KindMismatch {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn not_found(kind: ResourceKind, key: ObjectKey) -> Self {
        Self::NotFound { kind, key }
    }

    pub fn already_exists(kind: ResourceKind, key: ObjectKey) -> Self {
        Self::AlreadyExists { kind, key }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
