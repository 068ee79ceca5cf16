//! Error types for the reconciler crate.
//!
//! Everything in [`Error`] is fatal for the pass that produced it: the worker
//! logs it and hands the key back to the queue with exponential backoff.
//! Expected outcomes (a missing object, a lost write race) are not errors;
//! they are reported through [`crate::WriteOutcome`] and
//! [`crate::ReconcileResult`].

use std::fmt;

use flightdeck_store::{ResourceKind, StoreError};

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone)]
pub enum Error {
    /// A store call failed in a way the loop cannot handle.
    Store {
        operation: String,
        source: StoreError,
    },
    /// An owner cannot be referenced (it was never persisted).
    InvalidOwner { kind: ResourceKind, name: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
    /// Configuration could not be loaded.
    ConfigLoad { reason: String },
    /// Waiting for a condition took too long.
    Timeout { what: String, waited_ms: u64 },
    /// The store's watch stream closed.
    WatchClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { operation, source } => {
                write!(f, "store operation '{operation}' failed: {source}")
            }
            Self::InvalidOwner { kind, name } => {
                write!(f, "{kind} '{name}' has no uid and cannot own objects")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::ConfigLoad { reason } => {
                write!(f, "failed to load configuration: {reason}")
            }
            Self::Timeout { what, waited_ms } => {
                write!(f, "timed out after {waited_ms}ms waiting for {what}")
            }
            Self::WatchClosed => {
                write!(f, "store watch closed")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<flightdeck_core::Error> for Error {
    fn from(err: flightdeck_core::Error) -> Self {
        Self::ConfigLoad {
            reason: err.to_string(),
        }
    }
}

impl Error {
    /// Create a store error.
    pub fn store(operation: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid owner error.
    pub fn invalid_owner(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::InvalidOwner {
            kind,
            name: name.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>, waited: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
