//! Workflow definitions: the static graph an entity moves through
//!
//! A Workflow is a directed graph where:
//! - Nodes are states (where an entity currently is)
//! - Edges are transitions (how an actor moves it on)
//!
//! A transition has no fixed source: any state that lists it in its
//! outgoing set may use it. States carry the role/permission grants that
//! hold on an entity while it sits in that state.

use crate::{Attributes, PermissionId, RoleId, StateId, TransitionId, Value, WorkflowId};
use serde::{Deserialize, Serialize};

// ── Workflow ─────────────────────────────────────────────────────────

/// A named state machine definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique codename
    pub id: WorkflowId,
    /// Unique human-readable name
    pub name: String,
    /// Explicit initial state. When unset the graph store picks a default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<StateId>,
    /// Permissions this workflow is responsible for. Only these are revoked
    /// and re-granted when an entity changes state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<PermissionId>,
}

impl Workflow {
    /// Create a new workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(id),
            name: name.into(),
            initial_state: None,
            permissions: Vec::new(),
        }
    }

    pub fn with_initial_state(mut self, state: impl Into<String>) -> Self {
        self.initial_state = Some(StateId::new(state));
        self
    }

    /// Make the workflow responsible for a permission
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.add_permission(PermissionId::new(permission));
        self
    }

    /// Add a managed permission. Returns `false` if it was already managed.
    pub fn add_permission(&mut self, permission: PermissionId) -> bool {
        if self.permissions.contains(&permission) {
            return false;
        }
        self.permissions.push(permission);
        true
    }

    /// Check whether this workflow manages the given permission
    pub fn is_responsible_for(&self, permission: &PermissionId) -> bool {
        self.permissions.contains(permission)
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ── State ────────────────────────────────────────────────────────────

/// "While an entity is in this state, `role` holds `permission` on it."
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub role: RoleId,
    pub permission: PermissionId,
}

impl PermissionGrant {
    pub fn new(role: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            role: RoleId::new(role),
            permission: PermissionId::new(permission),
        }
    }
}

/// A node of a workflow graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Unique codename (across all workflows)
    pub id: StateId,
    /// Display name
    pub name: String,
    /// The workflow this state belongs to
    pub workflow: WorkflowId,
    /// Outgoing transitions, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionId>,
    /// Role/permission grants held while an entity is in this state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<PermissionGrant>,
}

impl State {
    /// Create a new state
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        workflow: impl Into<String>,
    ) -> Self {
        Self {
            id: StateId::new(id),
            name: name.into(),
            workflow: WorkflowId::new(workflow),
            transitions: Vec::new(),
            grants: Vec::new(),
        }
    }

    /// List a transition as outgoing from this state
    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.add_transition(TransitionId::new(transition));
        self
    }

    pub fn with_grant(mut self, role: impl Into<String>, permission: impl Into<String>) -> Self {
        self.add_grant(PermissionGrant::new(role, permission));
        self
    }

    /// Returns `false` if the transition was already listed
    pub fn add_transition(&mut self, transition: TransitionId) -> bool {
        if self.transitions.contains(&transition) {
            return false;
        }
        self.transitions.push(transition);
        true
    }

    /// Returns `false` if the (role, permission) pair was already granted
    pub fn add_grant(&mut self, grant: PermissionGrant) -> bool {
        if self.grants.contains(&grant) {
            return false;
        }
        self.grants.push(grant);
        true
    }

    pub fn has_transition(&self, transition: &TransitionId) -> bool {
        self.transitions.contains(transition)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.workflow)
    }
}

// ── Transition ───────────────────────────────────────────────────────

/// An edge of a workflow graph, gated by an optional permission and an
/// optional guard condition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Unique codename (across all workflows)
    pub id: TransitionId,
    /// Display name
    pub name: String,
    /// The workflow this transition belongs to
    pub workflow: WorkflowId,
    /// Destination state. `None` keeps the entity where it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<StateId>,
    /// Guard condition evaluated against (entity, actor, transition)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Permission the actor must hold on the entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionId>,
}

impl Transition {
    /// Create a transition with no destination, guard or permission
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        workflow: impl Into<String>,
    ) -> Self {
        Self {
            id: TransitionId::new(id),
            name: name.into(),
            workflow: WorkflowId::new(workflow),
            destination: None,
            condition: None,
            permission: None,
        }
    }

    pub fn with_destination(mut self, state: impl Into<String>) -> Self {
        self.destination = Some(StateId::new(state));
        self
    }

    /// Set the guard condition. A blank condition means "no guard".
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.condition = if condition.trim().is_empty() {
            None
        } else {
            Some(condition)
        };
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(PermissionId::new(permission));
        self
    }

    /// The guard condition, ignoring blank strings
    pub fn guard(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .filter(|condition| !condition.trim().is_empty())
    }

    /// Whether applying this transition from `current` leaves the state unchanged
    pub fn keeps_state(&self, current: &StateId) -> bool {
        match &self.destination {
            None => true,
            Some(destination) => destination == current,
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.workflow)
    }
}

impl Attributes for Transition {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "codename" | "id" => Some(Value::Str(self.id.0.clone())),
            "name" => Some(Value::Str(self.name.clone())),
            "workflow" => Some(Value::Str(self.workflow.0.clone())),
            "destination" => Some(self.destination.as_ref().map(|s| s.0.clone()).into()),
            "permission" => Some(self.permission.as_ref().map(|p| p.0.clone()).into()),
            _ => None,
        }
    }
}
