//! The seam between the manager and a control loop.

use async_trait::async_trait;
use flightdeck_store::{ObjectKey, ResourceKind};

use crate::error::Result;
use crate::types::ReconcileResult;

/// A control loop for one primary kind.
///
/// A pass is stateless: everything it needs is read from the store. The
/// manager never runs two passes for the same key at once.
#[async_trait]
pub trait Reconcile: Send + Sync {
    /// Name used in logs and spans.
    fn name(&self) -> &'static str;

    /// The kind whose objects this loop converges.
    fn kind(&self) -> ResourceKind;

    /// Kinds whose changes re-trigger the controller owner's pass.
    fn owns(&self) -> &'static [ResourceKind] {
        &[]
    }

    /// Run one pass for the object at `key`.
    async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileResult>;
}
