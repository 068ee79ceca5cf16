//! Store trait and implementations.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, broadcast};

use crate::error::{StoreError, StoreResult};
use crate::resources::{Object, Resource};
use crate::types::{ObjectKey, ResourceKind, Section, Uid};
use crate::validation::validate;
use crate::watch::{EventType, WatchEvent, WatchReceiver};

/// Default number of undelivered watch events buffered per subscriber.
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

/// Trait for object storage backends.
///
/// Every write carries the `resource_version` last read; a stale version is
/// rejected with [`StoreError::Conflict`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one object.
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Resource>;

    /// List every object of a kind.
    async fn list(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>>;

    /// List every object with an owner reference naming `owner`.
    async fn list_owned_by(&self, owner: Uid) -> StoreResult<Vec<Resource>>;

    /// Persist a new object, assigning its uid and first version.
    ///
    /// Every owner the object names must be stored with the referenced uid;
    /// otherwise the owner is reported as [`StoreError::NotFound`].
    async fn create(&self, resource: Resource) -> StoreResult<Resource>;

    /// Replace one section of an existing object.
    async fn update(&self, resource: Resource, section: Section) -> StoreResult<Resource>;

    /// Delete an object and, transitively, everything it owns.
    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<()>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> WatchReceiver;
}

/// Typed convenience methods over any [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn get_object<T: Object>(&self, key: &ObjectKey) -> StoreResult<T> {
        let resource = self.get(T::KIND, key).await?;
        T::try_from_resource(resource)
    }

    async fn list_objects<T: Object>(&self) -> StoreResult<Vec<T>> {
        self.list(T::KIND)
            .await?
            .into_iter()
            .map(T::try_from_resource)
            .collect()
    }

    async fn create_object<T: Object>(&self, object: T) -> StoreResult<T> {
        let created = self.create(object.into_resource()).await?;
        T::try_from_resource(created)
    }

    async fn update_object<T: Object>(&self, object: T, section: Section) -> StoreResult<T> {
        let updated = self.update(object.into_resource(), section).await?;
        T::try_from_resource(updated)
    }

    async fn delete_object<T: Object>(&self, key: &ObjectKey) -> StoreResult<()> {
        self.delete(T::KIND, key).await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

type ObjectMap = BTreeMap<(ResourceKind, ObjectKey), Resource>;

/// In-memory store with optimistic concurrency, cascade deletion, and watch.
pub struct InMemoryStore {
    objects: RwLock<ObjectMap>,
    events: broadcast::Sender<WatchEvent>,
    writes: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }
}

impl InMemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory store wrapped in an Arc.
    #[must_use]
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create a store whose subscribers buffer at most `capacity` events.
    #[must_use]
    pub fn with_watch_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            objects: RwLock::new(BTreeMap::new()),
            events,
            writes: AtomicU64::new(0),
        }
    }

    /// Number of persisted writes (creates, effective updates, deletions).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn record_write(&self, event: WatchEvent) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Fail unless every owner named by `resource` is stored under the referenced uid.
    fn check_owners(objects: &ObjectMap, resource: &Resource) -> StoreResult<()> {
        let meta = resource.metadata();
        for owner in &meta.owner_references {
            let key = ObjectKey::new(meta.namespace.clone(), owner.name.clone());
            let live = objects
                .get(&(owner.kind, key.clone()))
                .and_then(|r| r.metadata().uid);
            if live != Some(owner.uid) {
                return Err(StoreError::not_found(owner.kind, key));
            }
        }
        Ok(())
    }

    /// Remove every object owned, directly or transitively, by `root`.
    fn collect_dependents(objects: &mut ObjectMap, root: Uid) -> Vec<Resource> {
        let mut removed = Vec::new();
        let mut owners = VecDeque::from([root]);

        while let Some(owner) = owners.pop_front() {
            let keys: Vec<_> = objects
                .iter()
                .filter(|(_, r)| r.metadata().is_owned_by(owner))
                .map(|(k, _)| k.clone())
                .collect();

            for key in keys {
                if let Some(dependent) = objects.remove(&key) {
                    if let Some(uid) = dependent.metadata().uid {
                        owners.push_back(uid);
                    }
                    removed.push(dependent);
                }
            }
        }
        removed
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Resource> {
        let objects = self.objects.read().await;
        objects
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, key.clone()))
    }

    async fn list(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn list_owned_by(&self, owner: Uid) -> StoreResult<Vec<Resource>> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter(|r| r.metadata().is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn create(&self, mut resource: Resource) -> StoreResult<Resource> {
        validate(&resource)?;

        let kind = resource.kind();
        let key = resource.key();
        let mut objects = self.objects.write().await;
        if objects.contains_key(&(kind, key.clone())) {
            return Err(StoreError::already_exists(kind, key));
        }
        Self::check_owners(&objects, &resource)?;

        let meta = resource.metadata_mut();
        meta.uid = Some(Uid::new());
        meta.resource_version = 1;
        meta.creation_timestamp = Some(Utc::now());

        objects.insert((kind, key), resource.clone());
        self.record_write(WatchEvent::for_resource(EventType::Added, &resource));
        Ok(resource)
    }

    async fn update(&self, resource: Resource, section: Section) -> StoreResult<Resource> {
        let kind = resource.kind();
        let key = resource.key();
        let mut objects = self.objects.write().await;
        let stored = objects
            .get(&(kind, key.clone()))
            .ok_or_else(|| StoreError::not_found(kind, key.clone()))?;

        let expected = resource.metadata().resource_version;
        let actual = stored.metadata().resource_version;
        if expected != actual {
            return Err(StoreError::Conflict {
                kind,
                key,
                expected,
                actual,
            });
        }

        let mut next = stored.clone();
        if !next.replace_section(&resource, section)? {
            return Ok(stored.clone());
        }
        validate(&next)?;
        if next.metadata().owner_references != stored.metadata().owner_references {
            Self::check_owners(&objects, &next)?;
        }
        next.metadata_mut().resource_version = actual.saturating_add(1);

        objects.insert((kind, key), next.clone());
        self.record_write(WatchEvent::for_resource(EventType::Modified, &next));
        Ok(next)
    }

    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        let removed = objects
            .remove(&(kind, key.clone()))
            .ok_or_else(|| StoreError::not_found(kind, key.clone()))?;

        let dependents = removed
            .metadata()
            .uid
            .map(|uid| Self::collect_dependents(&mut objects, uid))
            .unwrap_or_default();

        self.record_write(WatchEvent::for_resource(EventType::Deleted, &removed));
        for dependent in &dependents {
            tracing::debug!(
                kind = %dependent.kind(),
                key = %dependent.key(),
                owner = %key,
                "Garbage collecting dependent"
            );
            self.record_write(WatchEvent::for_resource(EventType::Deleted, dependent));
        }
        Ok(())
    }

    fn subscribe(&self) -> WatchReceiver {
        self.events.subscribe()
    }
}

/// A wrapper that adds tracing to a store.
pub struct TracingStore<S: Store> {
    inner: S,
}

impl<S: Store> TracingStore<S> {
    /// Create a new tracing store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for TracingStore<S> {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<Resource> {
        tracing::trace!(%kind, %key, "Getting object");
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        tracing::trace!(%kind, "Listing objects");
        self.inner.list(kind).await
    }

    async fn list_owned_by(&self, owner: Uid) -> StoreResult<Vec<Resource>> {
        tracing::trace!(%owner, "Listing owned objects");
        self.inner.list_owned_by(owner).await
    }

    async fn create(&self, resource: Resource) -> StoreResult<Resource> {
        tracing::debug!(kind = %resource.kind(), key = %resource.key(), "Creating object");
        let result = self.inner.create(resource).await;
        if let Ok(ref created) = result {
            tracing::trace!(
                uid = ?created.metadata().uid,
                resource_version = created.metadata().resource_version,
                "Object created"
            );
        }
        result
    }

    async fn update(&self, resource: Resource, section: Section) -> StoreResult<Resource> {
        tracing::debug!(
            kind = %resource.kind(),
            key = %resource.key(),
            %section,
            resource_version = resource.metadata().resource_version,
            "Updating object"
        );
        self.inner.update(resource, section).await
    }

    async fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> StoreResult<()> {
        tracing::debug!(%kind, %key, "Deleting object");
        self.inner.delete(kind, key).await
    }

    fn subscribe(&self) -> WatchReceiver {
        self.inner.subscribe()
    }
}
