//! Creating owned children idempotently.

use flightdeck_store::{Object, ObjectKey, ObjectMeta, ObjectReference, Store, StoreExt};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Make sure a `C` named `key` exists and return a reference to it.
///
/// An existing object is adopted as-is, which makes a pass that failed
/// half-way safe to re-run. Adopted objects keep their own owner references,
/// so one created without `owner` is not garbage-collected with it. A missing
/// one is created with its default desired state and a controller owner
/// reference to `owner`. The owner itself is not updated.
///
/// Returns `None` when `owner` was deleted before the child could be created.
pub async fn ensure_owned<C, O>(
    store: &dyn Store,
    owner: &O,
    key: &ObjectKey,
) -> Result<Option<ObjectReference>>
where
    C: Object,
    O: Object,
{
    match store.get_object::<C>(key).await {
        Ok(existing) => return Ok(Some(existing.object_reference())),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(Error::store(format!("get {} {key}", C::KIND), e)),
    }

    let owner_reference = owner
        .controller_reference()
        .ok_or_else(|| Error::invalid_owner(O::KIND, &owner.metadata().name))?;

    let mut meta = ObjectMeta::new(&key.namespace, &key.name);
    meta.owner_references.push(owner_reference);

    match store.create_object(C::from_meta(meta)).await {
        Ok(created) => {
            info!(
                kind = %C::KIND,
                %key,
                owner = %owner.metadata().name,
                "Created owned object"
            );
            Ok(Some(created.object_reference()))
        }
        Err(e) if e.is_not_found() => {
            debug!(kind = %C::KIND, %key, "Owner deleted, not creating");
            Ok(None)
        }
        Err(e) if e.is_already_exists() => {
            debug!(kind = %C::KIND, %key, "Created concurrently, adopting");
            store
                .get_object::<C>(key)
                .await
                .map(|existing| Some(existing.object_reference()))
                .map_err(|e| Error::store(format!("get {} {key}", C::KIND), e))
        }
        Err(e) => Err(Error::store(format!("create {} {key}", C::KIND), e)),
    }
}
