//! Entity binding storage
//!
//! The [`BindingStore`] trait is the seam to the host's persistence layer.
//! It stores three kinds of records:
//!
//! - workflow bindings, keyed by [`WorkflowTarget`] (one per entity, one per type)
//! - state bindings, keyed by entity (one per entity, updated in place)
//! - append-only state history entries
//!
//! [`InMemoryBindingStore`] is the bundled implementation.

pub mod memory;

pub use memory::InMemoryBindingStore;

use workflow_types::{
    EntityRef, EntityType, StateBinding, StateHistoryEntry, StateId, WorkflowBinding,
    WorkflowId, WorkflowTarget,
};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Collaborator store errors. Propagated unchanged by the engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Storage interface for workflow bindings, state bindings and history.
pub trait BindingStore: Send + Sync {
    /// The workflow bound directly to a target, ignoring inheritance
    fn workflow_binding(&self, target: &WorkflowTarget) -> StoreResult<Option<WorkflowId>>;

    /// Create or overwrite the binding for `binding.target`
    fn put_workflow_binding(&self, binding: WorkflowBinding) -> StoreResult<()>;

    /// Delete a binding, returning the workflow it pointed at
    fn delete_workflow_binding(&self, target: &WorkflowTarget) -> StoreResult<Option<WorkflowId>>;

    /// Every binding that points at `workflow`
    fn bindings_for_workflow(&self, workflow: &WorkflowId) -> StoreResult<Vec<WorkflowBinding>>;

    fn state_binding(&self, entity: &EntityRef) -> StoreResult<Option<StateBinding>>;

    /// Create or update an entity's state binding, refreshing its timestamp
    fn upsert_state_binding(&self, entity: &EntityRef, state: &StateId)
        -> StoreResult<StateBinding>;

    /// Returns `true` if a binding was deleted
    fn delete_state_binding(&self, entity: &EntityRef) -> StoreResult<bool>;

    /// State bindings of every entity of one type
    fn state_bindings_for_type(&self, entity_type: &EntityType) -> StoreResult<Vec<StateBinding>>;

    fn append_history(&self, entry: StateHistoryEntry) -> StoreResult<()>;

    /// History entries of one entity, oldest first
    fn history(&self, entity: &EntityRef) -> StoreResult<Vec<StateHistoryEntry>>;
}
