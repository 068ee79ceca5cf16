//! Change notifications emitted by the store.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::resources::Resource;
use crate::types::{ObjectKey, OwnerReference, ResourceKind};

/// What happened to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub kind: ResourceKind,
    pub key: ObjectKey,
    pub resource_version: u64,
    /// Owner references of the object at the time of the change.
    pub owner_references: Vec<OwnerReference>,
}

impl WatchEvent {
    /// Build an event describing `resource`.
    #[must_use]
    pub fn for_resource(event_type: EventType, resource: &Resource) -> Self {
        let meta = resource.metadata();
        Self {
            event_type,
            kind: resource.kind(),
            key: meta.key(),
            resource_version: meta.resource_version,
            owner_references: meta.owner_references.clone(),
        }
    }

    /// The controller owner reference, if the object has one.
    #[must_use]
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }
}

/// Receiving half of a store watch.
pub type WatchReceiver = broadcast::Receiver<WatchEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Object, Pedals};
    use crate::types::{ObjectMeta, Uid};

    #[test]
    fn test_event_carries_owner_references() {
        let mut pedals = Pedals::from_meta(ObjectMeta::new("default", "n123ab"));
        let uid = Uid::new();
        pedals.metadata.owner_references.push(OwnerReference {
            kind: ResourceKind::Airplane,
            name: "cessna".to_string(),
            uid,
            controller: true,
            block_owner_deletion: true,
        });
        pedals.metadata.resource_version = 3;

        let event = WatchEvent::for_resource(EventType::Modified, &pedals.into_resource());
        assert_eq!(event.kind, ResourceKind::Pedals);
        assert_eq!(event.resource_version, 3);
        assert_eq!(event.controller_owner().map(|r| r.uid), Some(uid));
    }
}
