//! Entity references and actors
//!
//! The engine never looks inside host objects. It works with an
//! [`EntityRef`] as a lookup key and hands the host's [`WorkflowEntity`]
//! to the guard evaluator and permission gate.

use crate::{ActorId, Attributes, EntityType, PermissionId, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A (type tag, identifier) pair naming any host domain object
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::new(entity_type),
            id: id.into(),
        }
    }

    pub fn is_instance_of(&self, entity_type: &EntityType) -> bool {
        &self.entity_type == entity_type
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

impl Attributes for EntityRef {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Str(self.id.clone())),
            "type" => Some(Value::Str(self.entity_type.0.clone())),
            _ => None,
        }
    }
}

/// Specialised permission check a host entity may provide.
///
/// When an entity exposes one through [`WorkflowEntity::permission_check`],
/// its answer replaces the permission backend's default check.
pub trait PermissionCheck {
    fn has_permission(&self, actor: &Actor, permission: &PermissionId) -> bool;
}

/// A host object that can be attached to a workflow
pub trait WorkflowEntity: Attributes {
    /// The stable reference used as the binding key
    fn entity_ref(&self) -> EntityRef;

    /// Optional permission override; `None` uses the backend default
    fn permission_check(&self) -> Option<&dyn PermissionCheck> {
        None
    }
}

impl WorkflowEntity for EntityRef {
    fn entity_ref(&self) -> EntityRef {
        self.clone()
    }
}

/// The acting principal of a transition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl Attributes for Actor {
    fn attribute(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return Some(Value::Str(self.id.0.clone()));
        }
        self.attributes.get(name).cloned()
    }
}
