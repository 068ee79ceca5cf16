//! Reading an airplane's whole control chain and waiting for it to settle.

use std::time::Duration;

use flightdeck_store::{Airplane, Object, ObjectKey, Pedals, Rudder, Store, StoreError, StoreExt};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{Error, Result};

/// Snapshot of an airplane and the parts it controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    pub airplane: Airplane,
    pub pedals: Option<Pedals>,
    pub rudder: Option<Rudder>,
}

impl ChainState {
    /// Read the chain rooted at the airplane `key`. `None` if the airplane
    /// does not exist.
    pub async fn read(store: &dyn Store, key: &ObjectKey) -> Result<Option<Self>> {
        let airplane = match store.get_object::<Airplane>(key).await {
            Ok(airplane) => airplane,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(Error::store(format!("get Airplane {key}"), e)),
        };

        let parts = airplane.parts_key();
        let pedals = optional(store.get_object::<Pedals>(&parts).await)
            .map_err(|e| Error::store(format!("get Pedals {parts}"), e))?;
        let rudder = optional(store.get_object::<Rudder>(&parts).await)
            .map_err(|e| Error::store(format!("get Rudder {parts}"), e))?;

        Ok(Some(Self {
            airplane,
            pedals,
            rudder,
        }))
    }

    /// Whether every loop in the chain has nothing left to do.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        let (Some(pedals), Some(rudder)) = (&self.pedals, &self.rudder) else {
            return false;
        };
        let linkage = pedals.status.linkage_position;

        self.airplane.status.pedals.as_ref() == Some(&pedals.object_reference())
            && self.airplane.status.rudder.as_ref() == Some(&rudder.object_reference())
            && linkage == pedals.spec.pressed.linkage_position()
            && rudder.spec.position == linkage
            && rudder.status.position == rudder.spec.position
    }
}

fn optional<T>(result: std::result::Result<T, StoreError>) -> std::result::Result<Option<T>, StoreError> {
    match result {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Wait until the chain rooted at `key` satisfies `done`.
///
/// Re-reads the chain after every store change. Fails with
/// [`Error::Timeout`] if `timeout` passes first.
pub async fn wait_for<F>(
    store: &dyn Store,
    key: &ObjectKey,
    timeout: Duration,
    done: F,
) -> Result<ChainState>
where
    F: FnMut(&ChainState) -> bool + Send,
{
    tokio::time::timeout(timeout, watch_chain(store, key, done))
        .await
        .map_err(|_| Error::timeout(format!("chain of {key}"), timeout))?
}

async fn watch_chain<F>(store: &dyn Store, key: &ObjectKey, mut done: F) -> Result<ChainState>
where
    F: FnMut(&ChainState) -> bool + Send,
{
    let mut events = store.subscribe();
    loop {
        if let Some(chain) = ChainState::read(store, key).await? {
            if done(&chain) {
                return Ok(chain);
            }
        }

        match events.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return Err(Error::WatchClosed),
        }
    }
}

/// Wait until every loop in the chain rooted at `key` has converged.
pub async fn wait_until_converged(
    store: &dyn Store,
    key: &ObjectKey,
    timeout: Duration,
) -> Result<ChainState> {
    wait_for(store, key, timeout, ChainState::is_converged).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use flightdeck_store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_fresh_airplane_is_not_converged() -> Result<()> {
        let store = InMemoryStore::new();
        let plane = store
            .create_object(Airplane::new("default", "cessna", "N123AB"))
            .await
            .unwrap();

        let chain = ChainState::read(&store, &plane.key()).await?.unwrap();
        assert!(chain.pedals.is_none());
        assert!(!chain.is_converged());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_airplane_reads_as_none() -> Result<()> {
        let store = InMemoryStore::new();
        let chain = ChainState::read(&store, &ObjectKey::new("default", "ghost")).await?;
        assert!(chain.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_controllers() {
        let store = InMemoryStore::new();
        let plane = store
            .create_object(Airplane::new("default", "cessna", "N123AB"))
            .await
            .unwrap();

        let result = wait_until_converged(&store, &plane.key(), Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
