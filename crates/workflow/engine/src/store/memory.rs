//! In-memory [`BindingStore`] for tests and single-process hosts.

use super::{BindingStore, StoreError, StoreResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use workflow_types::{
    EntityRef, EntityType, StateBinding, StateHistoryEntry, StateId, WorkflowBinding,
    WorkflowId, WorkflowTarget,
};

/// Map-backed binding store. Keying by target and entity enforces the
/// one-binding uniqueness rules.
#[derive(Default)]
pub struct InMemoryBindingStore {
    workflows: RwLock<HashMap<WorkflowTarget, WorkflowId>>,
    states: RwLock<HashMap<EntityRef, StateBinding>>,
    history: RwLock<HashMap<EntityRef, Vec<StateHistoryEntry>>>,
}

impl InMemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BindingStore for InMemoryBindingStore {
    fn workflow_binding(&self, target: &WorkflowTarget) -> StoreResult<Option<WorkflowId>> {
        let guard = self
            .workflows
            .read()
            .map_err(|_| StoreError::Backend("workflow binding lock poisoned".to_string()))?;
        Ok(guard.get(target).cloned())
    }

    fn put_workflow_binding(&self, binding: WorkflowBinding) -> StoreResult<()> {
        let mut guard = self
            .workflows
            .write()
            .map_err(|_| StoreError::Backend("workflow binding lock poisoned".to_string()))?;
        guard.insert(binding.target, binding.workflow);
        Ok(())
    }

    fn delete_workflow_binding(&self, target: &WorkflowTarget) -> StoreResult<Option<WorkflowId>> {
        let mut guard = self
            .workflows
            .write()
            .map_err(|_| StoreError::Backend("workflow binding lock poisoned".to_string()))?;
        Ok(guard.remove(target))
    }

    fn bindings_for_workflow(&self, workflow: &WorkflowId) -> StoreResult<Vec<WorkflowBinding>> {
        let guard = self
            .workflows
            .read()
            .map_err(|_| StoreError::Backend("workflow binding lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|(_, bound)| *bound == workflow)
            .map(|(target, bound)| WorkflowBinding {
                target: target.clone(),
                workflow: bound.clone(),
            })
            .collect())
    }

    fn state_binding(&self, entity: &EntityRef) -> StoreResult<Option<StateBinding>> {
        let guard = self
            .states
            .read()
            .map_err(|_| StoreError::Backend("state binding lock poisoned".to_string()))?;
        Ok(guard.get(entity).cloned())
    }

    fn upsert_state_binding(
        &self,
        entity: &EntityRef,
        state: &StateId,
    ) -> StoreResult<StateBinding> {
        let mut guard = self
            .states
            .write()
            .map_err(|_| StoreError::Backend("state binding lock poisoned".to_string()))?;
        let binding = guard
            .entry(entity.clone())
            .and_modify(|existing| {
                existing.state = state.clone();
                existing.updated_at = Utc::now();
            })
            .or_insert_with(|| StateBinding::new(entity.clone(), state.clone()));
        Ok(binding.clone())
    }

    fn delete_state_binding(&self, entity: &EntityRef) -> StoreResult<bool> {
        let mut guard = self
            .states
            .write()
            .map_err(|_| StoreError::Backend("state binding lock poisoned".to_string()))?;
        Ok(guard.remove(entity).is_some())
    }

    fn state_bindings_for_type(&self, entity_type: &EntityType) -> StoreResult<Vec<StateBinding>> {
        let guard = self
            .states
            .read()
            .map_err(|_| StoreError::Backend("state binding lock poisoned".to_string()))?;
        let mut bindings: Vec<StateBinding> = guard
            .values()
            .filter(|b| b.entity.is_instance_of(entity_type))
            .cloned()
            .collect();
        bindings.sort_by(|a, b| a.entity.cmp(&b.entity));
        Ok(bindings)
    }

    fn append_history(&self, entry: StateHistoryEntry) -> StoreResult<()> {
        let mut guard = self
            .history
            .write()
            .map_err(|_| StoreError::Backend("history lock poisoned".to_string()))?;
        guard.entry(entry.entity.clone()).or_default().push(entry);
        Ok(())
    }

    fn history(&self, entity: &EntityRef) -> StoreResult<Vec<StateHistoryEntry>> {
        let guard = self
            .history
            .read()
            .map_err(|_| StoreError::Backend("history lock poisoned".to_string()))?;
        Ok(guard.get(entity).cloned().unwrap_or_default())
    }
}
