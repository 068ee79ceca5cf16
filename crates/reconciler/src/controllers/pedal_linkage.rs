use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flightdeck_store::{ObjectKey, Pedals, ResourceKind, Rudder, Section, Store, StoreExt};
use tracing::{debug, info};

use crate::controller::Reconcile;
use crate::converge;
use crate::error::{Error, Result};
use crate::types::{ReconcileResult, WriteOutcome};

/// Moves the pedal linkage to match the press and passes it on to the rudder.
///
/// The rudder shares the pedals' key. It is written as a second, separately
/// conflict-checked write after the linkage position is settled.
pub struct PedalLinkageReconciler {
    store: Arc<dyn Store>,
    missing_rudder_delay: Duration,
}

impl PedalLinkageReconciler {
    pub fn new(store: Arc<dyn Store>, missing_rudder_delay: Duration) -> Self {
        Self {
            store,
            missing_rudder_delay,
        }
    }
}

#[async_trait]
impl Reconcile for PedalLinkageReconciler {
    fn name(&self) -> &'static str {
        "pedal-linkage"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Pedals
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileResult> {
        let store = self.store.as_ref();

        let mut pedals = match store.get_object::<Pedals>(key).await {
            Ok(pedals) => pedals,
            Err(e) if e.is_not_found() => return Ok(ReconcileResult::Done),
            Err(e) => return Err(Error::store(format!("get Pedals {key}"), e)),
        };

        let wanted = pedals.spec.pressed.linkage_position();
        if pedals.status.linkage_position != wanted {
            let outcome = converge::apply(store, pedals, Section::Observed, |p| {
                p.status.linkage_position = wanted;
            })
            .await?;
            pedals = match outcome {
                WriteOutcome::Applied(pedals) => {
                    info!(linkage_position = %wanted, "Linkage moved");
                    pedals
                }
                WriteOutcome::Conflict => return Ok(ReconcileResult::Requeue),
                WriteOutcome::NotFound => return Ok(ReconcileResult::Done),
            };
        }
        let linkage = pedals.status.linkage_position;

        let rudder = match store.get_object::<Rudder>(key).await {
            Ok(rudder) => rudder,
            Err(e) if e.is_not_found() => {
                debug!(delay = ?self.missing_rudder_delay, "Rudder not created yet");
                return Ok(ReconcileResult::RequeueAfter(self.missing_rudder_delay));
            }
            Err(e) => return Err(Error::store(format!("get Rudder {key}"), e)),
        };

        if rudder.spec.position == linkage {
            return Ok(ReconcileResult::Done);
        }

        let outcome = converge::apply(store, rudder, Section::Desired, |r| {
            r.spec.position = linkage;
        })
        .await?;

        match outcome {
            WriteOutcome::Applied(_) => {
                info!(target_position = %linkage, "Rudder target set");
                Ok(ReconcileResult::Done)
            }
            WriteOutcome::Conflict => Ok(ReconcileResult::Requeue),
            // A recreated rudder does not re-trigger the pedals.
            WriteOutcome::NotFound => Ok(ReconcileResult::RequeueAfter(self.missing_rudder_delay)),
        }
    }
}
