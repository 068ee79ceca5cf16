//! Store double for exercising loop failure paths.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use flightdeck_store::{
    InMemoryStore, ObjectKey, Resource, ResourceKind, Section, Store, StoreError, StoreResult, Uid,
    WatchReceiver,
};

/// Error returned in place of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Conflict,
    Unavailable,
}

/// [`InMemoryStore`] that fails chosen writes once each and counts reads.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    faults: Mutex<Vec<(ResourceKind, Section, Fault)>>,
    gets: Mutex<BTreeMap<ResourceKind, u32>>,
}

impl FlakyStore {
    /// Fail the next `section` write to a `kind` object with `fault`.
    pub fn fail_next(&self, kind: ResourceKind, section: Section, fault: Fault) {
        self.faults.lock().unwrap().push((kind, section, fault));
    }

    /// Reads of `kind` so far.
    pub fn gets(&self, kind: ResourceKind) -> u32 {
        self.gets.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    fn take_fault(&self, kind: ResourceKind, section: Section) -> Option<Fault> {
        let mut faults = self.faults.lock().unwrap();
        let position = faults
            .iter()
            .position(|(k, s, _)| *k == kind && *s == section)?;
        Some(faults.remove(position).2)
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Resource> {
        {
            let mut gets = self.gets.lock().unwrap();
            let count = gets.entry(kind).or_default();
            *count = count.saturating_add(1);
        }
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        self.inner.list(kind).await
    }

    async fn list_owned_by(&self, owner: Uid) -> StoreResult<Vec<Resource>> {
        self.inner.list_owned_by(owner).await
    }

    async fn create(&self, resource: Resource) -> StoreResult<Resource> {
        self.inner.create(resource).await
    }

    async fn update(&self, resource: Resource, section: Section) -> StoreResult<Resource> {
        match self.take_fault(resource.kind(), section) {
            Some(Fault::Conflict) => {
                let expected = resource.metadata().resource_version;
                Err(StoreError::Conflict {
                    kind: resource.kind(),
                    key: resource.key(),
                    expected,
                    actual: expected.saturating_add(1),
                })
            }
            Some(Fault::Unavailable) => Err(StoreError::unavailable("injected")),
            None => self.inner.update(resource, section).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<()> {
        self.inner.delete(kind, key).await
    }

    fn subscribe(&self) -> WatchReceiver {
        self.inner.subscribe()
    }
}
