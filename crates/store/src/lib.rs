//! Versioned object store for flightdeck resources.
//!
//! The store is the only shared state between control loops. It provides:
//!
//! - **Optimistic concurrency**: every object carries a `resource_version`;
//!   writes based on a stale version fail with [`StoreError::Conflict`].
//! - **Sections**: a write replaces either the desired (`spec`) or the
//!   observed (`status`) half of an object, never both.
//! - **Ownership**: deleting an object removes everything whose owner
//!   references name it, transitively.
//! - **Watch**: every effective write is broadcast as a [`WatchEvent`].
//! - **Admission**: objects are validated before they are persisted.

pub mod error;
pub mod manifest;
pub mod resources;
pub mod store;
pub mod types;
pub mod validation;
pub mod watch;

pub use error::{StoreError, StoreResult};
pub use manifest::{ApplyReport, Manifest, apply_manifest};
pub use resources::{
    Airplane, AirplaneSpec, AirplaneStatus, Object, Pedals, PedalsSpec, PedalsStatus, Position,
    Pressed, Resource, Rudder, RudderSpec, RudderStatus,
};
pub use store::{DEFAULT_WATCH_CAPACITY, InMemoryStore, Store, StoreExt, TracingStore};
pub use types::{
    ObjectKey, ObjectMeta, ObjectReference, OwnerReference, ResourceKind, Section, Uid,
};
pub use validation::{TAIL_NUMBER_PATTERN, validate, validate_tail_number};
pub use watch::{EventType, WatchEvent, WatchReceiver};
