use std::sync::Arc;

use async_trait::async_trait;
use flightdeck_store::{
    Airplane, ObjectKey, Pedals, ResourceKind, Rudder, Section, Store, StoreExt,
};
use tracing::{debug, info};

use crate::controller::Reconcile;
use crate::converge;
use crate::error::{Error, Result};
use crate::linker::ensure_owned;
use crate::types::{ReconcileResult, WriteOutcome};

/// Creates an airplane's pedals and rudder and records references to them.
pub struct AirplaneReconciler {
    store: Arc<dyn Store>,
}

impl AirplaneReconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Reconcile for AirplaneReconciler {
    fn name(&self) -> &'static str {
        "airplane"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Airplane
    }

    fn owns(&self) -> &'static [ResourceKind] {
        &[ResourceKind::Pedals, ResourceKind::Rudder]
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileResult> {
        let store = self.store.as_ref();

        let airplane = match store.get_object::<Airplane>(key).await {
            Ok(airplane) => airplane,
            Err(e) if e.is_not_found() => {
                debug!("Airplane is gone");
                return Ok(ReconcileResult::Done);
            }
            Err(e) => return Err(Error::store(format!("get Airplane {key}"), e)),
        };

        let parts = airplane.parts_key();
        let Some(pedals) = ensure_owned::<Pedals, _>(store, &airplane, &parts).await? else {
            debug!("Airplane deleted during pass");
            return Ok(ReconcileResult::Done);
        };
        let Some(rudder) = ensure_owned::<Rudder, _>(store, &airplane, &parts).await? else {
            debug!("Airplane deleted during pass");
            return Ok(ReconcileResult::Done);
        };

        if airplane.status.pedals.as_ref() == Some(&pedals)
            && airplane.status.rudder.as_ref() == Some(&rudder)
        {
            return Ok(ReconcileResult::Done);
        }

        let outcome = converge::apply(store, airplane, Section::Observed, |a| {
            a.status.pedals = Some(pedals);
            a.status.rudder = Some(rudder);
        })
        .await?;

        match outcome {
            WriteOutcome::Applied(_) => {
                info!(parts = %parts, "Recorded pedals and rudder");
                Ok(ReconcileResult::Requeue)
            }
            WriteOutcome::Conflict => {
                info!("Airplane changed during pass, retrying");
                Ok(ReconcileResult::Requeue)
            }
            WriteOutcome::NotFound => Ok(ReconcileResult::Done),
        }
    }
}
