//! Transition engine: binds workflows to entities and moves them between
//! states.
//!
//! The engine owns the [`WorkflowRegistry`] and talks to three pluggable
//! collaborators:
//!
//! - a [`BindingStore`] for workflow bindings, state bindings and history
//! - a [`PermissionBackend`] for checks and recomputed grants
//! - a [`GuardEvaluator`] for transition conditions
//!
//! Every state change runs the same protocol: `before_state_change`, upsert
//! the state binding, append history, `after_state_change`, then recompute
//! permissions. Nothing is rolled back if a step fails.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::hooks::{EventHooks, HookPoint, StateChangeEvent, TransitionEvent};
use crate::permission::{InMemoryPermissions, PermissionBackend, PermissionGate, RoleScope};
use crate::registry::WorkflowRegistry;
use crate::store::{BindingStore, InMemoryBindingStore};
use std::sync::Arc;
use workflow_guard::{ExpressionGuard, GuardContext, GuardError, GuardEvaluator};
use workflow_types::{
    Actor, Attributes, EntityRef, EntityType, State, StateHistoryEntry, StateId, Transition,
    TransitionId, Value, Workflow, WorkflowBinding, WorkflowEntity, WorkflowError, WorkflowId,
    WorkflowTarget,
};

/// The workflow engine
pub struct WorkflowEngine {
    config: EngineConfig,
    registry: WorkflowRegistry,
    bindings: Arc<dyn BindingStore>,
    gate: PermissionGate,
    guard: Arc<dyn GuardEvaluator>,
    hooks: EventHooks,
}

impl WorkflowEngine {
    /// Create an engine with in-memory collaborators and the built-in guard
    /// language
    pub fn new(config: EngineConfig, registry: WorkflowRegistry) -> Self {
        let guard = Arc::new(ExpressionGuard::new(config.guard.clone()));
        Self {
            config,
            registry,
            bindings: Arc::new(InMemoryBindingStore::new()),
            gate: PermissionGate::new(Arc::new(InMemoryPermissions::new())),
            guard,
            hooks: EventHooks::new(),
        }
    }

    pub fn with_binding_store(mut self, bindings: Arc<dyn BindingStore>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_permission_backend(mut self, backend: Arc<dyn PermissionBackend>) -> Self {
        self.gate = PermissionGate::new(backend);
        self
    }

    pub fn with_guard_evaluator(mut self, guard: Arc<dyn GuardEvaluator>) -> Self {
        self.guard = guard;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Mutable access for definition edits. Existing bindings are not migrated.
    pub fn registry_mut(&mut self) -> &mut WorkflowRegistry {
        &mut self.registry
    }

    pub fn bindings(&self) -> &Arc<dyn BindingStore> {
        &self.bindings
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionBackend> {
        self.gate.backend()
    }

    pub fn hooks_mut(&mut self) -> &mut EventHooks {
        &mut self.hooks
    }

    // ── Workflow assignment ──────────────────────────────────────────

    /// The workflow an entity follows: its own binding, else its type's
    pub fn get_workflow(&self, entity: &EntityRef) -> EngineResult<Option<&Workflow>> {
        Ok(self
            .resolve_workflow_id(entity)?
            .and_then(|id| self.registry.workflow(&id)))
    }

    /// Attach a workflow, named by codename or name, to one entity.
    ///
    /// Resets the entity to the workflow's initial state through the full
    /// state-change protocol. Does nothing if the entity is already bound
    /// to exactly this workflow. Returns `false` for an unknown workflow.
    pub fn set_workflow(&self, entity: &EntityRef, workflow: &str) -> EngineResult<bool> {
        self.set_workflow_for_entity(entity, workflow)
    }

    pub fn set_workflow_for_entity(&self, entity: &EntityRef, workflow: &str) -> EngineResult<bool> {
        let Some(workflow) = self.registry.find_workflow(workflow) else {
            tracing::debug!(entity = %entity, workflow, "Unknown workflow");
            return Ok(false);
        };

        let target = WorkflowTarget::Entity(entity.clone());
        if self.bindings.workflow_binding(&target)?.as_ref() == Some(&workflow.id) {
            return Ok(true);
        }
        let previous = self.get_workflow(entity)?.filter(|w| w.id != workflow.id);

        self.bindings.put_workflow_binding(WorkflowBinding {
            target,
            workflow: workflow.id.clone(),
        })?;
        tracing::info!(entity = %entity, workflow = %workflow.id, "Workflow assigned to entity");

        // Grants owned by the workflow being replaced no longer apply
        if let Some(previous) = previous {
            if !previous.permissions.is_empty() {
                self.gate.backend().remove_permissions(
                    entity,
                    RoleScope::All,
                    &previous.permissions,
                )?;
            }
        }

        match self.registry.initial_state(&workflow.id) {
            Some(initial) => self.change_state(entity, initial)?,
            None => {
                // No states to enter; drop the stale position
                self.bindings.delete_state_binding(entity)?;
                self.update_permissions(entity)?;
            }
        }
        Ok(true)
    }

    /// Attach a workflow to an entity type.
    ///
    /// Existing entities of the type keep their current state; use
    /// [`set_initial_state`](Self::set_initial_state) to migrate them.
    pub fn set_workflow_for_type(
        &self,
        entity_type: &EntityType,
        workflow: &str,
    ) -> EngineResult<bool> {
        let Some(workflow) = self.registry.find_workflow(workflow) else {
            tracing::debug!(entity_type = %entity_type, workflow, "Unknown workflow");
            return Ok(false);
        };

        self.bindings.put_workflow_binding(WorkflowBinding {
            target: WorkflowTarget::Type(entity_type.clone()),
            workflow: workflow.id.clone(),
        })?;
        tracing::info!(entity_type = %entity_type, workflow = %workflow.id, "Workflow assigned to type");
        Ok(true)
    }

    pub fn set_workflow_to(&self, target: &WorkflowTarget, workflow: &str) -> EngineResult<bool> {
        match target {
            WorkflowTarget::Entity(entity) => self.set_workflow_for_entity(entity, workflow),
            WorkflowTarget::Type(entity_type) => self.set_workflow_for_type(entity_type, workflow),
        }
    }

    /// Remove a workflow binding from an entity or a type
    pub fn remove_workflow(&self, target: &WorkflowTarget) -> EngineResult<bool> {
        match target {
            WorkflowTarget::Entity(entity) => self.remove_workflow_from_entity(entity),
            WorkflowTarget::Type(entity_type) => self.remove_workflow_from_type(entity_type),
        }
    }

    /// Remove an entity's own workflow binding.
    ///
    /// Deletes its state binding and resets its permissions. If the entity
    /// still inherits a workflow from its type, it is put into that
    /// workflow's initial state. Returns `false` if there was no binding.
    pub fn remove_workflow_from_entity(&self, entity: &EntityRef) -> EngineResult<bool> {
        let target = WorkflowTarget::Entity(entity.clone());
        let Some(removed) = self.bindings.delete_workflow_binding(&target)? else {
            return Ok(false);
        };

        self.detach(entity)?;
        tracing::info!(entity = %entity, workflow = %removed, "Workflow removed from entity");

        if let Some(inherited) = self.resolve_workflow_id(entity)? {
            if let Some(initial) = self.registry.initial_state(&inherited) {
                self.change_state(entity, initial)?;
            }
        }
        Ok(true)
    }

    /// Remove a type's workflow binding and detach every entity that was
    /// following it through the type
    pub fn remove_workflow_from_type(&self, entity_type: &EntityType) -> EngineResult<bool> {
        let target = WorkflowTarget::Type(entity_type.clone());
        let Some(removed) = self.bindings.delete_workflow_binding(&target)? else {
            return Ok(false);
        };

        let mut detached = 0usize;
        for binding in self.bindings.state_bindings_for_type(entity_type)? {
            if self.has_own_binding(&binding.entity)? {
                continue;
            }
            self.detach(&binding.entity)?;
            detached += 1;
        }

        tracing::info!(
            entity_type = %entity_type,
            workflow = %removed,
            detached,
            "Workflow removed from type"
        );
        Ok(true)
    }

    /// Every entity that currently follows `workflow`
    pub fn objects_for_workflow(&self, workflow: &str) -> EngineResult<Vec<EntityRef>> {
        let Some(workflow) = self.registry.find_workflow(workflow) else {
            return Ok(Vec::new());
        };

        let mut entities = Vec::new();
        for binding in self.bindings.bindings_for_workflow(&workflow.id)? {
            match binding.target {
                WorkflowTarget::Entity(entity) => entities.push(entity),
                WorkflowTarget::Type(entity_type) => {
                    for state in self.bindings.state_bindings_for_type(&entity_type)? {
                        if !self.has_own_binding(&state.entity)? {
                            entities.push(state.entity);
                        }
                    }
                }
            }
        }
        entities.sort();
        entities.dedup();
        Ok(entities)
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn get_state(&self, entity: &EntityRef) -> EngineResult<Option<&State>> {
        Ok(self
            .bindings
            .state_binding(entity)?
            .and_then(|binding| self.registry.state(&binding.state)))
    }

    /// Move an entity to `state` through the full state-change protocol.
    ///
    /// Runs even when the entity is already in `state`. Returns `false` if
    /// the state is unknown or not part of the entity's workflow.
    pub fn set_state(&self, entity: &EntityRef, state: &StateId) -> EngineResult<bool> {
        let Some(state) = self.registry.state(state) else {
            tracing::debug!(entity = %entity, state = %state, "Unknown state");
            return Ok(false);
        };

        let workflow = self.resolve_workflow_id(entity)?;
        if workflow.as_ref() != Some(&state.workflow) {
            tracing::warn!(
                entity = %entity,
                state = %state.id,
                state_workflow = %state.workflow,
                entity_workflow = ?workflow,
                "Refusing to set a state outside the entity's workflow"
            );
            return Ok(false);
        }

        self.change_state(entity, state)?;
        Ok(true)
    }

    /// Put an entity into its workflow's initial state.
    ///
    /// Returns `false` if the entity has no workflow, or the workflow has
    /// no states.
    pub fn set_initial_state(&self, entity: &EntityRef) -> EngineResult<bool> {
        let Some(workflow) = self.resolve_workflow_id(entity)? else {
            return Ok(false);
        };
        let Some(initial) = self.registry.initial_state(&workflow) else {
            return Ok(false);
        };
        self.change_state(entity, initial)?;
        Ok(true)
    }

    /// Recorded state changes of an entity, oldest first
    pub fn state_history(&self, entity: &EntityRef) -> EngineResult<Vec<StateHistoryEntry>> {
        Ok(self.bindings.history(entity)?)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Transitions `actor` may take from the entity's current state, in
    /// declaration order
    pub fn allowed_transitions(
        &self,
        entity: &dyn WorkflowEntity,
        actor: &Actor,
    ) -> EngineResult<Vec<&Transition>> {
        let reference = entity.entity_ref();
        let Some(current) = self.get_state(&reference)? else {
            return Ok(Vec::new());
        };

        let mut allowed = Vec::new();
        for transition in self.registry.outgoing_transitions(&current.id) {
            if self.is_allowed(entity, actor, transition)? {
                allowed.push(transition);
            }
        }
        Ok(allowed)
    }

    /// Take a transition named by codename.
    ///
    /// Returns `false` without side effects if the transition is unknown or
    /// not currently allowed.
    pub fn do_transition(
        &self,
        entity: &dyn WorkflowEntity,
        transition: &TransitionId,
        actor: &Actor,
    ) -> EngineResult<bool> {
        match self.registry.transition(transition) {
            Some(transition) => self.apply_transition(entity, transition, actor),
            None => {
                tracing::debug!(transition = %transition, "Unknown transition");
                Ok(false)
            }
        }
    }

    /// Take a transition.
    ///
    /// Fires `before_transition`, changes state if the destination differs
    /// from the current state, then fires `after_transition`.
    pub fn apply_transition(
        &self,
        entity: &dyn WorkflowEntity,
        transition: &Transition,
        actor: &Actor,
    ) -> EngineResult<bool> {
        let reference = entity.entity_ref();
        let Some(from) = self.get_state(&reference)? else {
            return Ok(false);
        };

        // Must be offered by the current state, as registered
        let offered = from.has_transition(&transition.id)
            && transition.workflow == from.workflow
            && self.registry.transition(&transition.id) == Some(transition);
        if !offered || !self.is_allowed(entity, actor, transition)? {
            tracing::debug!(
                entity = %reference,
                transition = %transition.id,
                actor = %actor.id,
                "Transition not allowed"
            );
            return Ok(false);
        }
        let destination = match &transition.destination {
            Some(id) if !transition.keeps_state(&from.id) => Some(
                self.registry
                    .state(id)
                    .ok_or_else(|| WorkflowError::StateNotFound(id.clone()))?,
            ),
            _ => None,
        };

        let event = TransitionEvent {
            entity: &reference,
            from,
            transition,
            actor,
        };
        self.hooks.fire_transition(HookPoint::BeforeTransition, &event)?;
        if let Some(to) = destination {
            self.change_state(&reference, to)?;
        }
        self.hooks.fire_transition(HookPoint::AfterTransition, &event)?;

        tracing::info!(
            entity = %reference,
            transition = %transition.id,
            actor = %actor.id,
            from = %from.id,
            "Transition applied"
        );
        Ok(true)
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Every stored guard condition that the evaluator rejects
    pub fn validate_guards(&self) -> Vec<(TransitionId, GuardError)> {
        self.registry
            .all_transitions()
            .into_iter()
            .filter_map(|t| {
                let condition = t.guard()?;
                self.guard
                    .check(condition)
                    .err()
                    .map(|err| (t.id.clone(), err))
            })
            .collect()
    }

    // ── Internals ────────────────────────────────────────────────────

    pub(crate) fn resolve_workflow_id(&self, entity: &EntityRef) -> EngineResult<Option<WorkflowId>> {
        if let Some(id) = self
            .bindings
            .workflow_binding(&WorkflowTarget::Entity(entity.clone()))?
        {
            return Ok(Some(id));
        }
        Ok(self
            .bindings
            .workflow_binding(&WorkflowTarget::Type(entity.entity_type.clone()))?)
    }

    fn has_own_binding(&self, entity: &EntityRef) -> EngineResult<bool> {
        Ok(self
            .bindings
            .workflow_binding(&WorkflowTarget::Entity(entity.clone()))?
            .is_some())
    }

    fn detach(&self, entity: &EntityRef) -> EngineResult<()> {
        self.bindings.delete_state_binding(entity)?;
        let revoked = self.gate.backend().reset(entity)?;
        tracing::debug!(entity = %entity, revoked, "Entity detached from workflow");
        Ok(())
    }

    /// The state-change protocol
    fn change_state(&self, entity: &EntityRef, to: &State) -> EngineResult<()> {
        let from = self.get_state(entity)?;
        let event = StateChangeEvent { entity, from, to };

        self.hooks.fire_state_change(HookPoint::BeforeStateChange, &event)?;
        self.bindings.upsert_state_binding(entity, &to.id)?;
        if self.config.enable_state_history {
            self.bindings
                .append_history(StateHistoryEntry::new(entity.clone(), to.id.clone()))?;
        }
        self.hooks.fire_state_change(HookPoint::AfterStateChange, &event)?;

        tracing::debug!(
            entity = %entity,
            from = ?from.map(|s| s.id.as_str()),
            to = %to.id,
            "State changed"
        );
        self.update_permissions(entity)?;
        Ok(())
    }

    fn is_allowed(
        &self,
        entity: &dyn WorkflowEntity,
        actor: &Actor,
        transition: &Transition,
    ) -> EngineResult<bool> {
        if let Some(permission) = &transition.permission {
            if !self.gate.check(entity, actor, permission)? {
                tracing::debug!(
                    transition = %transition.id,
                    actor = %actor.id,
                    permission = %permission,
                    "Permission check failed"
                );
                return Ok(false);
            }
        }

        let Some(condition) = transition.guard() else {
            return Ok(true);
        };
        let attributes = EntityAttributes(entity);
        let ctx = GuardContext::new(&attributes, actor, transition);
        match self.guard.evaluate(condition, &ctx) {
            Ok(passed) => Ok(passed),
            Err(err) => {
                tracing::debug!(
                    transition = %transition.id,
                    error = %err,
                    "Guard failed to evaluate; treating as not met"
                );
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("config", &self.config)
            .field("workflows", &self.registry.count())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Exposes a host entity's attributes to the guard evaluator
struct EntityAttributes<'a>(&'a dyn WorkflowEntity);

impl Attributes for EntityAttributes<'_> {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.0.attribute(name)
    }
}
