//! Resource definitions: airplanes, their pedals, and their rudders.
//!
//! Every resource has a desired section (`spec`) and an observed section
//! (`status`). Enumerated fields are closed enums, so an unknown value is
//! rejected when the resource is parsed.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::types::{ObjectKey, ObjectMeta, ObjectReference, OwnerReference, ResourceKind, Section};

/// How far the pedals are pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pressed {
    #[default]
    None,
    Left,
    Right,
}

impl Pressed {
    /// Position the pedal linkage settles in for this input.
    #[must_use]
    pub const fn linkage_position(self) -> Position {
        match self {
            Self::None => Position::Neutral,
            Self::Left => Position::Left,
            Self::Right => Position::Right,
        }
    }
}

impl std::fmt::Display for Pressed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

impl std::str::FromStr for Pressed {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(StoreError::invalid(format!(
                "pressed must be one of none, left, right (got '{other}')"
            ))),
        }
    }
}

/// Linkage and rudder deflection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Neutral,
    Left,
    Right,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutral => f.write_str("neutral"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirplaneSpec {
    /// N-number registration, e.g. `N123AB`.
    pub tail_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirplaneStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedals: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rudder: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airplane {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: AirplaneSpec,
    #[serde(default)]
    pub status: AirplaneStatus,
}

impl Airplane {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        tail_number: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: AirplaneSpec {
                tail_number: tail_number.into(),
            },
            status: AirplaneStatus::default(),
        }
    }

    /// Key shared by this airplane's pedals and rudder.
    #[must_use]
    pub fn parts_key(&self) -> ObjectKey {
        ObjectKey::new(
            &self.metadata.namespace,
            self.spec.tail_number.to_lowercase(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedalsSpec {
    #[serde(default)]
    pub pressed: Pressed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedalsStatus {
    #[serde(default)]
    pub linkage_position: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pedals {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PedalsSpec,
    #[serde(default)]
    pub status: PedalsStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RudderSpec {
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RudderStatus {
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rudder {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RudderSpec,
    #[serde(default)]
    pub status: RudderStatus,
}

/// Any resource the store can hold, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Airplane(Airplane),
    Pedals(Pedals),
    Rudder(Rudder),
}

impl Resource {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Airplane(_) => ResourceKind::Airplane,
            Self::Pedals(_) => ResourceKind::Pedals,
            Self::Rudder(_) => ResourceKind::Rudder,
        }
    }

    #[must_use]
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Airplane(o) => &o.metadata,
            Self::Pedals(o) => &o.metadata,
            Self::Rudder(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Airplane(o) => &mut o.metadata,
            Self::Pedals(o) => &mut o.metadata,
            Self::Rudder(o) => &mut o.metadata,
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata().key()
    }

    /// Copy one section of `from` into `self`.
    ///
    /// Returns whether anything changed. Replacing the desired section also
    /// replaces owner references.
    pub fn replace_section(&mut self, from: &Self, section: Section) -> StoreResult<bool> {
        if self.kind() != from.kind() {
            return Err(StoreError::KindMismatch {
                expected: self.kind(),
                actual: from.kind(),
            });
        }

        let owners_changed = section == Section::Desired
            && replace(
                &mut self.metadata_mut().owner_references,
                &from.metadata().owner_references,
            );

        let changed = match (self, from) {
            (Self::Airplane(to), Self::Airplane(from)) => match section {
                Section::Desired => replace(&mut to.spec, &from.spec),
                Section::Observed => replace(&mut to.status, &from.status),
            },
            (Self::Pedals(to), Self::Pedals(from)) => match section {
                Section::Desired => replace(&mut to.spec, &from.spec),
                Section::Observed => replace(&mut to.status, &from.status),
            },
            (Self::Rudder(to), Self::Rudder(from)) => match section {
                Section::Desired => replace(&mut to.spec, &from.spec),
                Section::Observed => replace(&mut to.status, &from.status),
            },
            (to, from) => {
                return Err(StoreError::KindMismatch {
                    expected: to.kind(),
                    actual: from.kind(),
                });
            }
        };
        Ok(changed || owners_changed)
    }

    /// One-line, column-style summary of the object.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Airplane(a) => format!(
                "Airplane {} TAILNUMBER={} PEDALS={} RUDDER={}",
                a.metadata.key(),
                a.spec.tail_number,
                a.status.pedals.as_ref().map_or("-", |r| r.name.as_str()),
                a.status.rudder.as_ref().map_or("-", |r| r.name.as_str()),
            ),
            Self::Pedals(p) => format!(
                "Pedals {} PRESSED={} LINKAGE={}",
                p.metadata.key(),
                p.spec.pressed,
                p.status.linkage_position,
            ),
            Self::Rudder(r) => format!(
                "Rudder {} DESIRED POSITION={} CURRENT POSITION={}",
                r.metadata.key(),
                r.spec.position,
                r.status.position,
            ),
        }
    }
}

fn replace<T: Clone + PartialEq>(to: &mut T, from: &T) -> bool {
    if to == from {
        return false;
    }
    to.clone_from(from);
    true
}

/// Statically typed view of one resource kind.
pub trait Object: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// A fresh object with default desired and observed sections.
    fn from_meta(metadata: ObjectMeta) -> Self;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn into_resource(self) -> Resource;

    /// Narrow a resource to this kind.
    fn try_from_resource(resource: Resource) -> StoreResult<Self>;

    fn key(&self) -> ObjectKey {
        self.metadata().key()
    }

    /// Reference to this object by kind, name, and namespace.
    fn object_reference(&self) -> ObjectReference {
        ObjectReference {
            kind: Self::KIND,
            name: self.metadata().name.clone(),
            namespace: self.metadata().namespace.clone(),
        }
    }

    /// Controller owner reference pointing at this object.
    ///
    /// Returns `None` until the object has been persisted and has a uid.
    fn controller_reference(&self) -> Option<OwnerReference> {
        self.metadata().uid.map(|uid| OwnerReference {
            kind: Self::KIND,
            name: self.metadata().name.clone(),
            uid,
            controller: true,
            block_owner_deletion: true,
        })
    }
}

macro_rules! impl_object {
    ($ty:ident) => {
        impl Object for $ty {
            const KIND: ResourceKind = ResourceKind::$ty;

            fn from_meta(metadata: ObjectMeta) -> Self {
                Self {
                    metadata,
                    ..Self::default()
                }
            }

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn into_resource(self) -> Resource {
                Resource::$ty(self)
            }

            fn try_from_resource(resource: Resource) -> StoreResult<Self> {
                match resource {
                    Resource::$ty(object) => Ok(object),
                    other => Err(StoreError::KindMismatch {
                        expected: Self::KIND,
                        actual: other.kind(),
                    }),
                }
            }
        }

        impl From<$ty> for Resource {
            fn from(object: $ty) -> Self {
                Resource::$ty(object)
            }
        }
    };
}

impl_object!(Airplane);
impl_object!(Pedals);
impl_object!(Rudder);
