//! Conflict-checked writes.
//!
//! [`apply`] performs exactly one write attempt and classifies the result.
//! It never retries: a lost race is reported as [`WriteOutcome::Conflict`] so
//! the caller can re-run from a fresh read, and a vanished object is reported
//! as [`WriteOutcome::NotFound`]. Anything else is an [`Error`].

use flightdeck_store::{Object, Section, Store, StoreExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::WriteOutcome;

/// Mutate `object` and persist one section of it.
pub async fn apply<T, F>(
    store: &dyn Store,
    mut object: T,
    section: Section,
    mutate: F,
) -> Result<WriteOutcome<T>>
where
    T: Object,
    F: FnOnce(&mut T) + Send,
{
    mutate(&mut object);
    write(store, object, section).await
}

/// Persist one section of `object`, already mutated by the caller.
pub async fn write<T: Object>(
    store: &dyn Store,
    object: T,
    section: Section,
) -> Result<WriteOutcome<T>> {
    let key = object.key();
    let resource_version = object.metadata().resource_version;

    match store.update_object(object, section).await {
        Ok(stored) => {
            debug!(
                kind = %T::KIND,
                %key,
                %section,
                resource_version = stored.metadata().resource_version,
                "Write applied"
            );
            Ok(WriteOutcome::Applied(stored))
        }
        Err(e) if e.is_conflict() => {
            debug!(kind = %T::KIND, %key, resource_version, "Write lost a race");
            Ok(WriteOutcome::Conflict)
        }
        Err(e) if e.is_not_found() => {
            debug!(kind = %T::KIND, %key, "Object vanished before write");
            Ok(WriteOutcome::NotFound)
        }
        Err(e) => Err(Error::store(format!("update {} {key}", T::KIND), e)),
    }
}
