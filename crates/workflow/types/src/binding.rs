//! Bindings: which workflow an entity follows, and where it currently is
//!
//! - A [`WorkflowBinding`] attaches a workflow to an entity type or to a
//!   single entity. Entity-level bindings override type-level ones.
//! - A [`StateBinding`] records an entity's current state. There is at
//!   most one per entity and it is updated in place.
//! - A [`StateHistoryEntry`] is an append-only record of a state change.

use crate::{EntityRef, EntityType, StateId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a workflow is attached to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTarget {
    /// Every entity of this type without its own binding
    Type(EntityType),
    /// One entity
    Entity(EntityRef),
}

impl WorkflowTarget {
    pub fn entity_type(&self) -> &EntityType {
        match self {
            Self::Type(entity_type) => entity_type,
            Self::Entity(entity) => &entity.entity_type,
        }
    }
}

impl From<EntityRef> for WorkflowTarget {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl From<EntityType> for WorkflowTarget {
    fn from(entity_type: EntityType) -> Self {
        Self::Type(entity_type)
    }
}

impl std::fmt::Display for WorkflowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Type(entity_type) => write!(f, "type {}", entity_type),
            Self::Entity(entity) => write!(f, "entity {}", entity),
        }
    }
}

/// Assignment of a workflow to a target. Unique per target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowBinding {
    pub target: WorkflowTarget,
    pub workflow: WorkflowId,
}

/// An entity's current position in its workflow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBinding {
    pub entity: EntityRef,
    pub state: StateId,
    /// Last time the binding was written
    pub updated_at: DateTime<Utc>,
}

impl StateBinding {
    pub fn new(entity: EntityRef, state: StateId) -> Self {
        Self {
            entity,
            state,
            updated_at: Utc::now(),
        }
    }
}

/// Immutable record of one state change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub id: uuid::Uuid,
    pub entity: EntityRef,
    pub state: StateId,
    pub recorded_at: DateTime<Utc>,
}

impl StateHistoryEntry {
    pub fn new(entity: EntityRef, state: StateId) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            entity,
            state,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_entity_type() {
        let doc = EntityRef::new("document", "1");
        let entity_target = WorkflowTarget::from(doc.clone());
        let type_target = WorkflowTarget::from(EntityType::new("document"));

        assert_eq!(entity_target.entity_type(), type_target.entity_type());
        assert_eq!(format!("{}", entity_target), "entity document:1");
        assert_eq!(format!("{}", type_target), "type document");
    }

    #[test]
    fn test_target_serde_shape() {
        let target = WorkflowTarget::Type(EntityType::new("document"));
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "document" }));
    }

    #[test]
    fn test_history_entries_are_distinct() {
        let doc = EntityRef::new("document", "1");
        let a = StateHistoryEntry::new(doc.clone(), StateId::new("draft"));
        let b = StateHistoryEntry::new(doc, StateId::new("draft"));
        assert_ne!(a.id, b.id);
        assert!(a.recorded_at <= b.recorded_at);
    }
}
