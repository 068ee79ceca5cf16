use std::sync::Arc;

use async_trait::async_trait;
use flightdeck_store::{ObjectKey, ResourceKind, Rudder, Section, Store, StoreExt};
use tracing::info;

use crate::controller::Reconcile;
use crate::converge;
use crate::error::{Error, Result};
use crate::types::{ReconcileResult, WriteOutcome};

/// Moves the rudder to its target position.
pub struct RudderReconciler {
    store: Arc<dyn Store>,
}

impl RudderReconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Reconcile for RudderReconciler {
    fn name(&self) -> &'static str {
        "rudder"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Rudder
    }

    async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileResult> {
        let store = self.store.as_ref();

        let rudder = match store.get_object::<Rudder>(key).await {
            Ok(rudder) => rudder,
            Err(e) if e.is_not_found() => return Ok(ReconcileResult::Done),
            Err(e) => return Err(Error::store(format!("get Rudder {key}"), e)),
        };

        let target = rudder.spec.position;
        if rudder.status.position == target {
            return Ok(ReconcileResult::Done);
        }

        let outcome = converge::apply(store, rudder, Section::Observed, |r| {
            r.status.position = target;
        })
        .await?;

        Ok(match outcome {
            WriteOutcome::Applied(_) => {
                info!(position = %target, "Rudder moved");
                ReconcileResult::Done
            }
            WriteOutcome::Conflict => ReconcileResult::Requeue,
            WriteOutcome::NotFound => ReconcileResult::Done,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use flightdeck_store::{InMemoryStore, Object, ObjectMeta, Position};

    use super::*;
    use crate::testing::{Fault, FlakyStore};

    async fn flaky_left() -> (Arc<FlakyStore>, RudderReconciler, ObjectKey) {
        let store = Arc::new(FlakyStore::default());
        let mut rudder = Rudder::from_meta(ObjectMeta::new("default", "n123ab"));
        rudder.spec.position = Position::Left;
        let key = store.create_object(rudder).await.unwrap().key();
        let reconciler = RudderReconciler::new(store.clone());
        (store, reconciler, key)
    }

    #[tokio::test]
    async fn test_rudder_follows_target() -> Result<()> {
        let store = InMemoryStore::new_arc();
        let mut rudder = Rudder::from_meta(ObjectMeta::new("default", "n123ab"));
        rudder.spec.position = Position::Right;
        let key = store.create_object(rudder).await.unwrap().key();
        let reconciler = RudderReconciler::new(store.clone());

        assert_eq!(reconciler.reconcile(&key).await?, ReconcileResult::Done);
        let rudder = store.get_object::<Rudder>(&key).await.unwrap();
        assert_eq!(rudder.status.position, Position::Right);

        let writes = store.write_count();
        reconciler.reconcile(&key).await?;
        assert_eq!(store.write_count(), writes);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_rudder_is_done() -> Result<()> {
        let reconciler = RudderReconciler::new(InMemoryStore::new_arc());
        let result = reconciler
            .reconcile(&ObjectKey::new("default", "n123ab"))
            .await?;
        assert_eq!(result, ReconcileResult::Done);
        Ok(())
    }

    #[tokio::test]
    async fn test_position_conflict_requeues() -> Result<()> {
        let (store, reconciler, key) = flaky_left().await;
        store.fail_next(ResourceKind::Rudder, Section::Observed, Fault::Conflict);

        assert_eq!(reconciler.reconcile(&key).await?, ReconcileResult::Requeue);
        assert_eq!(reconciler.reconcile(&key).await?, ReconcileResult::Done);
        let rudder = store.inner.get_object::<Rudder>(&key).await.unwrap();
        assert_eq!(rudder.status.position, Position::Left);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_position_write_is_fatal() {
        let (store, reconciler, key) = flaky_left().await;
        store.fail_next(ResourceKind::Rudder, Section::Observed, Fault::Unavailable);

        let result = reconciler.reconcile(&key).await;
        assert!(matches!(result, Err(Error::Store { .. })));
        let rudder = store.inner.get_object::<Rudder>(&key).await.unwrap();
        assert_eq!(rudder.status.position, Position::Neutral);
    }
}
