//! Core types for the reconciler.

use std::time::Duration;

/// What a reconciliation pass asks of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Converged, or nothing left to converge. Wait for the next change.
    Done,
    /// Run again right away, without backoff.
    Requeue,
    /// Run again after a fixed delay, for a dependency that is expected to
    /// appear on its own.
    RequeueAfter(Duration),
}

impl ReconcileResult {
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Classified result of a single conflict-checked write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// The write was persisted; carries the stored object.
    Applied(T),
    /// The object changed since it was read. Re-run from a fresh read.
    Conflict,
    /// The object no longer exists.
    NotFound,
}

impl<T> WriteOutcome<T> {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The stored object, if the write was applied.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(object) => Some(object),
            Self::Conflict | Self::NotFound => None,
        }
    }
}
