//! Workflow registry: stores and retrieves workflow definitions
//!
//! Holds every Workflow, State and Transition by codename. Codenames are
//! unique per kind across all workflows; workflow names are unique as well.
//! References between definitions (outgoing transition lists, destinations,
//! initial states) may be declared in any order and are checked by
//! [`WorkflowRegistry::validate`].

use std::collections::HashMap;
use workflow_types::{
    PermissionGrant, PermissionId, RoleId, State, StateId, Transition, TransitionId, Workflow,
    WorkflowError, WorkflowId, WorkflowResult,
};

/// Registry of workflow definitions
#[derive(Clone, Debug, Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<WorkflowId, Workflow>,
    /// Index by name → workflow codename
    by_name: HashMap<String, WorkflowId>,
    states: HashMap<StateId, State>,
    transitions: HashMap<TransitionId, Transition>,
}

impl WorkflowRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a workflow definition. Returns its codename.
    pub fn register_workflow(&mut self, workflow: Workflow) -> WorkflowResult<WorkflowId> {
        if self.workflows.contains_key(&workflow.id) {
            return Err(WorkflowError::DuplicateWorkflow(workflow.id));
        }
        if self.by_name.contains_key(&workflow.name) {
            return Err(WorkflowError::DuplicateWorkflowName(workflow.name));
        }

        let id = workflow.id.clone();
        self.by_name.insert(workflow.name.clone(), id.clone());
        self.workflows.insert(id.clone(), workflow);

        tracing::info!(workflow = %id, "Workflow registered");
        Ok(id)
    }

    /// Add a state to an already registered workflow
    pub fn add_state(&mut self, state: State) -> WorkflowResult<StateId> {
        self.require_workflow(&state.workflow)?;
        if self.states.contains_key(&state.id) {
            return Err(WorkflowError::DuplicateState(state.id));
        }

        let id = state.id.clone();
        tracing::debug!(workflow = %state.workflow, state = %id, "State added");
        self.states.insert(id.clone(), state);
        Ok(id)
    }

    /// Add a transition to an already registered workflow
    pub fn add_transition(&mut self, transition: Transition) -> WorkflowResult<TransitionId> {
        self.require_workflow(&transition.workflow)?;
        if self.transitions.contains_key(&transition.id) {
            return Err(WorkflowError::DuplicateTransition(transition.id));
        }

        let id = transition.id.clone();
        tracing::debug!(workflow = %transition.workflow, transition = %id, "Transition added");
        self.transitions.insert(id.clone(), transition);
        Ok(id)
    }

    /// List `transition` as outgoing from `state`.
    ///
    /// Both must exist and belong to the same workflow. Returns `false` if it
    /// was already listed.
    pub fn add_state_transition(
        &mut self,
        state: &StateId,
        transition: &TransitionId,
    ) -> WorkflowResult<bool> {
        let owner = self
            .transitions
            .get(transition)
            .map(|t| t.workflow.clone())
            .ok_or_else(|| WorkflowError::TransitionNotFound(transition.clone()))?;
        let state = self
            .states
            .get_mut(state)
            .ok_or_else(|| WorkflowError::StateNotFound(state.clone()))?;
        if state.workflow != owner {
            return Err(WorkflowError::TransitionWorkflowMismatch {
                transition: transition.clone(),
                expected: state.workflow.clone(),
                actual: owner,
            });
        }
        Ok(state.add_transition(transition.clone()))
    }

    /// Grant `permission` to `role` while an entity is in `state`
    pub fn add_grant(
        &mut self,
        state: &StateId,
        role: RoleId,
        permission: PermissionId,
    ) -> WorkflowResult<bool> {
        let state = self
            .states
            .get_mut(state)
            .ok_or_else(|| WorkflowError::StateNotFound(state.clone()))?;
        Ok(state.add_grant(PermissionGrant { role, permission }))
    }

    /// Make a workflow responsible for a permission
    pub fn add_workflow_permission(
        &mut self,
        workflow: &WorkflowId,
        permission: PermissionId,
    ) -> WorkflowResult<bool> {
        let workflow = self
            .workflows
            .get_mut(workflow)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow.clone()))?;
        Ok(workflow.add_permission(permission))
    }

    /// Set the explicit initial state of a workflow
    pub fn set_initial_state(
        &mut self,
        workflow: &WorkflowId,
        state: &StateId,
    ) -> WorkflowResult<()> {
        let owner = self
            .states
            .get(state)
            .map(|s| s.workflow.clone())
            .ok_or_else(|| WorkflowError::StateNotFound(state.clone()))?;
        if &owner != workflow {
            return Err(WorkflowError::StateWorkflowMismatch {
                state: state.clone(),
                expected: workflow.clone(),
                actual: owner,
            });
        }
        let workflow = self
            .workflows
            .get_mut(workflow)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow.clone()))?;
        workflow.initial_state = Some(state.clone());
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn workflow(&self, id: &WorkflowId) -> Option<&Workflow> {
        self.workflows.get(id)
    }

    pub fn workflow_by_name(&self, name: &str) -> Option<&Workflow> {
        self.by_name.get(name).and_then(|id| self.workflows.get(id))
    }

    /// Find a workflow by codename, falling back to its display name
    pub fn find_workflow(&self, codename_or_name: &str) -> Option<&Workflow> {
        self.workflows
            .get(&WorkflowId::new(codename_or_name))
            .or_else(|| self.workflow_by_name(codename_or_name))
    }

    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// All workflows, ordered by name
    pub fn workflows(&self) -> Vec<&Workflow> {
        let mut workflows: Vec<&Workflow> = self.workflows.values().collect();
        workflows.sort_by(|a, b| a.name.cmp(&b.name));
        workflows
    }

    /// States of a workflow, ordered by name then codename
    pub fn states_of(&self, workflow: &WorkflowId) -> Vec<&State> {
        let mut states: Vec<&State> = self
            .states
            .values()
            .filter(|s| &s.workflow == workflow)
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        states
    }

    /// Transitions of a workflow, ordered by name then codename
    pub fn transitions_of(&self, workflow: &WorkflowId) -> Vec<&Transition> {
        let mut transitions: Vec<&Transition> = self
            .transitions
            .values()
            .filter(|t| &t.workflow == workflow)
            .collect();
        transitions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        transitions
    }

    /// All transitions across every workflow, ordered by codename
    pub fn all_transitions(&self) -> Vec<&Transition> {
        let mut transitions: Vec<&Transition> = self.transitions.values().collect();
        transitions.sort_by(|a, b| a.id.cmp(&b.id));
        transitions
    }

    /// The state new entities start in.
    ///
    /// The explicit initial state if it is set and resolves to a state of
    /// this workflow, else the first state by name, else `None`.
    pub fn initial_state(&self, workflow: &WorkflowId) -> Option<&State> {
        let explicit = self
            .workflows
            .get(workflow)?
            .initial_state
            .as_ref()
            .and_then(|id| self.states.get(id))
            .filter(|s| &s.workflow == workflow);

        explicit.or_else(|| self.states_of(workflow).into_iter().next())
    }

    /// Outgoing transitions of a state, in declaration order.
    ///
    /// Listed transitions that are missing or belong to another workflow are
    /// skipped.
    pub fn outgoing_transitions(&self, state: &StateId) -> Vec<&Transition> {
        let Some(state) = self.states.get(state) else {
            return Vec::new();
        };
        state
            .transitions
            .iter()
            .filter_map(|id| self.transitions.get(id))
            .filter(|t| t.workflow == state.workflow)
            .collect()
    }

    /// Role/permission grants held in a state
    pub fn grants(&self, state: &StateId) -> &[PermissionGrant] {
        self.states
            .get(state)
            .map(|s| s.grants.as_slice())
            .unwrap_or_default()
    }

    /// Permissions the workflow is responsible for
    pub fn workflow_permissions(&self, workflow: &WorkflowId) -> &[PermissionId] {
        self.workflows
            .get(workflow)
            .map(|w| w.permissions.as_slice())
            .unwrap_or_default()
    }

    pub fn contains(&self, workflow: &WorkflowId) -> bool {
        self.workflows.contains_key(workflow)
    }

    /// Total number of registered workflows
    pub fn count(&self) -> usize {
        self.workflows.len()
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Remove a workflow together with its states and transitions
    pub fn remove_workflow(&mut self, id: &WorkflowId) -> WorkflowResult<Workflow> {
        let workflow = self
            .workflows
            .remove(id)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(id.clone()))?;
        self.by_name.remove(&workflow.name);
        self.states.retain(|_, s| &s.workflow != id);
        self.transitions.retain(|_, t| &t.workflow != id);

        tracing::info!(workflow = %id, "Workflow removed");
        Ok(workflow)
    }

    /// Remove a state.
    ///
    /// Transitions leading to it become "stay in place" transitions and it is
    /// cleared as its workflow's initial state.
    pub fn remove_state(&mut self, id: &StateId) -> WorkflowResult<State> {
        let state = self
            .states
            .remove(id)
            .ok_or_else(|| WorkflowError::StateNotFound(id.clone()))?;

        for transition in self.transitions.values_mut() {
            if transition.destination.as_ref() == Some(id) {
                transition.destination = None;
            }
        }
        if let Some(workflow) = self.workflows.get_mut(&state.workflow) {
            if workflow.initial_state.as_ref() == Some(id) {
                workflow.initial_state = None;
            }
        }

        tracing::debug!(workflow = %state.workflow, state = %id, "State removed");
        Ok(state)
    }

    /// Remove a transition and detach it from every state
    pub fn remove_transition(&mut self, id: &TransitionId) -> WorkflowResult<Transition> {
        let transition = self
            .transitions
            .remove(id)
            .ok_or_else(|| WorkflowError::TransitionNotFound(id.clone()))?;
        for state in self.states.values_mut() {
            state.transitions.retain(|t| t != id);
        }

        tracing::debug!(workflow = %transition.workflow, transition = %id, "Transition removed");
        Ok(transition)
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Check every reference inside one workflow
    pub fn validate(&self, workflow: &WorkflowId) -> WorkflowResult<()> {
        let wf = self.require_workflow(workflow)?;

        if let Some(initial) = &wf.initial_state {
            self.require_state_of(initial, workflow)?;
        }

        for state in self.states_of(workflow) {
            for id in &state.transitions {
                let transition = self
                    .transitions
                    .get(id)
                    .ok_or_else(|| WorkflowError::TransitionNotFound(id.clone()))?;
                if &transition.workflow != workflow {
                    return Err(WorkflowError::TransitionWorkflowMismatch {
                        transition: id.clone(),
                        expected: workflow.clone(),
                        actual: transition.workflow.clone(),
                    });
                }
            }
        }

        for transition in self.transitions_of(workflow) {
            if let Some(destination) = &transition.destination {
                self.require_state_of(destination, workflow)?;
            }
        }

        Ok(())
    }

    /// Validate every registered workflow
    pub fn validate_all(&self) -> WorkflowResult<()> {
        self.workflows().iter().try_for_each(|wf| self.validate(&wf.id))
    }

    fn require_workflow(&self, id: &WorkflowId) -> WorkflowResult<&Workflow> {
        self.workflows
            .get(id)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(id.clone()))
    }

    fn require_state_of(&self, id: &StateId, workflow: &WorkflowId) -> WorkflowResult<&State> {
        let state = self
            .states
            .get(id)
            .ok_or_else(|| WorkflowError::StateNotFound(id.clone()))?;
        if &state.workflow != workflow {
            return Err(WorkflowError::StateWorkflowMismatch {
                state: id.clone(),
                expected: workflow.clone(),
                actual: state.workflow.clone(),
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_registry() -> WorkflowRegistry {
        let mut registry = WorkflowRegistry::new();
        registry
            .register_workflow(
                Workflow::new("review", "Review")
                    .with_initial_state("draft")
                    .with_permission("can_edit"),
            )
            .unwrap();
        registry
            .add_state(
                State::new("draft", "Draft", "review")
                    .with_transition("submit")
                    .with_transition("comment"),
            )
            .unwrap();
        registry
            .add_state(State::new("pending", "Pending", "review").with_transition("publish"))
            .unwrap();
        registry
            .add_state(State::new("published", "Published", "review").with_grant("editor", "can_edit"))
            .unwrap();
        registry
            .add_transition(Transition::new("submit", "Submit", "review").with_destination("pending"))
            .unwrap();
        registry
            .add_transition(Transition::new("comment", "Comment", "review"))
            .unwrap();
        registry
            .add_transition(
                Transition::new("publish", "Publish", "review").with_destination("published"),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_get() {
        let registry = review_registry();
        assert_eq!(registry.count(), 1);
        assert!(registry.contains(&WorkflowId::new("review")));
        assert_eq!(registry.workflow_by_name("Review").unwrap().id.as_str(), "review");
        assert_eq!(registry.find_workflow("Review").unwrap().id.as_str(), "review");
        assert_eq!(registry.find_workflow("review").unwrap().name, "Review");
        assert!(registry.find_workflow("nope").is_none());
        assert!(registry.validate_all().is_ok());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut registry = review_registry();

        let result = registry.register_workflow(Workflow::new("review", "Other"));
        assert!(matches!(result, Err(WorkflowError::DuplicateWorkflow(_))));

        let result = registry.register_workflow(Workflow::new("other", "Review"));
        assert!(matches!(result, Err(WorkflowError::DuplicateWorkflowName(_))));

        let result = registry.add_state(State::new("draft", "Draft again", "review"));
        assert!(matches!(result, Err(WorkflowError::DuplicateState(_))));

        let result = registry.add_transition(Transition::new("submit", "Submit", "review"));
        assert!(matches!(result, Err(WorkflowError::DuplicateTransition(_))));
    }

    #[test]
    fn test_state_requires_workflow() {
        let mut registry = WorkflowRegistry::new();
        let result = registry.add_state(State::new("draft", "Draft", "missing"));
        assert!(matches!(result, Err(WorkflowError::WorkflowNotFound(_))));
    }

    #[test]
    fn test_outgoing_transitions_keep_declaration_order() {
        let registry = review_registry();
        let ids: Vec<&str> = registry
            .outgoing_transitions(&StateId::new("draft"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["submit", "comment"]);
        assert!(registry.outgoing_transitions(&StateId::new("missing")).is_empty());
    }

    #[test]
    fn test_explicit_initial_state() {
        let registry = review_registry();
        let initial = registry.initial_state(&WorkflowId::new("review")).unwrap();
        assert_eq!(initial.id.as_str(), "draft");
    }

    #[test]
    fn test_default_initial_state_is_lowest_name() {
        let mut registry = WorkflowRegistry::new();
        registry.register_workflow(Workflow::new("simple", "Simple")).unwrap();
        assert!(registry.initial_state(&WorkflowId::new("simple")).is_none());

        registry.add_state(State::new("z_closed", "Closed", "simple")).unwrap();
        registry.add_state(State::new("a_open", "Open", "simple")).unwrap();

        for _ in 0..5 {
            let initial = registry.initial_state(&WorkflowId::new("simple")).unwrap();
            assert_eq!(initial.id.as_str(), "z_closed");
        }
    }

    #[test]
    fn test_initial_state_must_belong_to_workflow() {
        let mut registry = review_registry();
        registry.register_workflow(Workflow::new("other", "Other")).unwrap();
        let result = registry.set_initial_state(&WorkflowId::new("other"), &StateId::new("draft"));
        assert!(matches!(result, Err(WorkflowError::StateWorkflowMismatch { .. })));
    }

    #[test]
    fn test_cross_workflow_transition_rejected() {
        let mut registry = review_registry();
        registry.register_workflow(Workflow::new("other", "Other")).unwrap();
        registry.add_state(State::new("open", "Open", "other")).unwrap();

        let result =
            registry.add_state_transition(&StateId::new("open"), &TransitionId::new("submit"));
        assert!(matches!(result, Err(WorkflowError::TransitionWorkflowMismatch { .. })));
    }

    #[test]
    fn test_validate_reports_dangling_destination() {
        let mut registry = review_registry();
        registry
            .add_transition(Transition::new("archive", "Archive", "review").with_destination("gone"))
            .unwrap();
        let result = registry.validate(&WorkflowId::new("review"));
        assert!(matches!(result, Err(WorkflowError::StateNotFound(_))));
    }

    #[test]
    fn test_grants_and_permissions() {
        let mut registry = review_registry();
        assert_eq!(registry.grants(&StateId::new("published")).len(), 1);
        assert!(registry.grants(&StateId::new("draft")).is_empty());

        let added = registry
            .add_grant(&StateId::new("draft"), RoleId::new("owner"), PermissionId::new("can_edit"))
            .unwrap();
        assert!(added);
        let again = registry
            .add_grant(&StateId::new("draft"), RoleId::new("owner"), PermissionId::new("can_edit"))
            .unwrap();
        assert!(!again);

        assert!(registry
            .add_workflow_permission(&WorkflowId::new("review"), PermissionId::new("can_view"))
            .unwrap());
        assert_eq!(registry.workflow_permissions(&WorkflowId::new("review")).len(), 2);
    }

    #[test]
    fn test_remove_state_cascades() {
        let mut registry = review_registry();
        registry.remove_state(&StateId::new("draft")).unwrap();

        let workflow = registry.workflow(&WorkflowId::new("review")).unwrap();
        assert!(workflow.initial_state.is_none());
        // Fallback now picks the lowest remaining name
        let initial = registry.initial_state(&WorkflowId::new("review")).unwrap();
        assert_eq!(initial.id.as_str(), "pending");

        registry.remove_state(&StateId::new("published")).unwrap();
        let publish = registry.transition(&TransitionId::new("publish")).unwrap();
        assert!(publish.destination.is_none());
    }

    #[test]
    fn test_remove_transition_detaches() {
        let mut registry = review_registry();
        registry.remove_transition(&TransitionId::new("submit")).unwrap();
        let ids: Vec<&str> = registry
            .outgoing_transitions(&StateId::new("draft"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["comment"]);
    }

    #[test]
    fn test_remove_workflow_cascades() {
        let mut registry = review_registry();
        let removed = registry.remove_workflow(&WorkflowId::new("review")).unwrap();
        assert_eq!(removed.name, "Review");
        assert!(registry.state(&StateId::new("draft")).is_none());
        assert!(registry.transition(&TransitionId::new("publish")).is_none());
        assert!(registry.workflow_by_name("Review").is_none());

        let result = registry.remove_workflow(&WorkflowId::new("review"));
        assert!(matches!(result, Err(WorkflowError::WorkflowNotFound(_))));
    }
}
