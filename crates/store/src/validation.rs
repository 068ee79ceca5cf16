//! Admission checks applied by the store before an object is persisted.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{StoreError, StoreResult};
use crate::resources::Resource;
use crate::types::ObjectMeta;

/// N-number registration: a leading `N` followed by five upper-case letters or digits.
pub const TAIL_NUMBER_PATTERN: &str = r"^N[A-Z\d]{5}$";

const NAME_PATTERN: &str = r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$";

const MAX_NAME_LEN: usize = 253;

static TAIL_NUMBER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(TAIL_NUMBER_PATTERN));

static NAME: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(NAME_PATTERN));

fn is_match(pattern: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> StoreResult<bool> {
    match &**pattern {
        Ok(re) => Ok(re.is_match(value)),
        Err(e) => Err(StoreError::unavailable(format!(
            "validation pattern failed to compile: {e}"
        ))),
    }
}

/// Check a tail number against [`TAIL_NUMBER_PATTERN`].
pub fn validate_tail_number(tail_number: &str) -> StoreResult<()> {
    if is_match(&TAIL_NUMBER, tail_number)? {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "spec.tailNumber '{tail_number}' must match {TAIL_NUMBER_PATTERN}"
        )))
    }
}

fn validate_name(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::invalid(format!("{field} must not be empty")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(StoreError::invalid(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if !is_match(&NAME, value)? {
        return Err(StoreError::invalid(format!(
            "{field} '{value}' must consist of lower case alphanumeric characters, '-' or '.'"
        )));
    }
    Ok(())
}

fn validate_meta(meta: &ObjectMeta) -> StoreResult<()> {
    validate_name("metadata.name", &meta.name)?;
    validate_name("metadata.namespace", &meta.namespace)?;

    let controllers = meta
        .owner_references
        .iter()
        .filter(|r| r.controller)
        .count();
    if controllers > 1 {
        return Err(StoreError::invalid(format!(
            "only one owner reference may be a controller, found {controllers}"
        )));
    }
    Ok(())
}

/// Validate a resource before it is written.
pub fn validate(resource: &Resource) -> StoreResult<()> {
    validate_meta(resource.metadata())?;
    match resource {
        Resource::Airplane(airplane) => validate_tail_number(&airplane.spec.tail_number),
        Resource::Pedals(_) | Resource::Rudder(_) => Ok(()),
    }
}
