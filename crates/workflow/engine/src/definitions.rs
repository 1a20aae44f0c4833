//! Declarative workflow definitions in TOML
//!
//! ```toml
//! [[workflow]]
//! codename = "review"
//! name = "Review"
//! initial_state = "draft"
//! permissions = ["can_edit", "can_publish"]
//!
//! [[workflow.state]]
//! codename = "draft"
//! name = "Draft"
//! transitions = ["publish"]
//! grants = [{ role = "owner", permission = "can_edit" }]
//!
//! [[workflow.transition]]
//! codename = "publish"
//! name = "Publish"
//! destination = "published"
//! permission = "can_publish"
//! condition = "entity.title != ''"
//! ```

use crate::registry::WorkflowRegistry;
use serde::Deserialize;
use workflow_types::{
    PermissionGrant, PermissionId, State, StateId, Transition, TransitionId, Workflow,
    WorkflowError, WorkflowId, WorkflowResult,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionFile {
    #[serde(default, rename = "workflow")]
    workflows: Vec<WorkflowDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowDef {
    codename: WorkflowId,
    name: String,
    #[serde(default)]
    initial_state: Option<StateId>,
    #[serde(default)]
    permissions: Vec<PermissionId>,
    #[serde(default, rename = "state")]
    states: Vec<StateDef>,
    #[serde(default, rename = "transition")]
    transitions: Vec<TransitionDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateDef {
    codename: StateId,
    name: String,
    #[serde(default)]
    transitions: Vec<TransitionId>,
    #[serde(default)]
    grants: Vec<PermissionGrant>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransitionDef {
    codename: TransitionId,
    name: String,
    #[serde(default)]
    destination: Option<StateId>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    permission: Option<PermissionId>,
}

impl WorkflowRegistry {
    /// Build a registry from a TOML definition document
    pub fn from_toml_str(contents: &str) -> WorkflowResult<Self> {
        let mut registry = Self::new();
        registry.load_toml_str(contents)?;
        Ok(registry)
    }

    /// Add every workflow of a TOML definition document.
    ///
    /// Each loaded workflow is validated. Returns the loaded codenames in
    /// document order. On error the registry is left unchanged.
    pub fn load_toml_str(&mut self, contents: &str) -> WorkflowResult<Vec<WorkflowId>> {
        let file: DefinitionFile = toml::from_str(contents)
            .map_err(|e| WorkflowError::InvalidDefinition(e.to_string()))?;

        let mut staged = self.clone();
        let mut loaded = Vec::with_capacity(file.workflows.len());
        for def in file.workflows {
            loaded.push(staged.load_workflow(def)?);
        }
        for id in &loaded {
            staged.validate(id)?;
        }
        *self = staged;

        tracing::info!(workflows = loaded.len(), "Workflow definitions loaded");
        Ok(loaded)
    }

    fn load_workflow(&mut self, def: WorkflowDef) -> WorkflowResult<WorkflowId> {
        let mut workflow = Workflow::new(def.codename.0, def.name);
        for permission in def.permissions {
            workflow.add_permission(permission);
        }
        let id = self.register_workflow(workflow)?;

        for state_def in def.states {
            let mut state = State::new(state_def.codename.0, state_def.name, id.0.clone());
            for transition in state_def.transitions {
                state.add_transition(transition);
            }
            for grant in state_def.grants {
                state.add_grant(grant);
            }
            self.add_state(state)?;
        }

        for transition_def in def.transitions {
            let mut transition =
                Transition::new(transition_def.codename.0, transition_def.name, id.0.clone());
            transition.destination = transition_def.destination;
            if let Some(condition) = transition_def.condition {
                transition = transition.with_condition(condition);
            }
            transition.permission = transition_def.permission;
            self.add_transition(transition)?;
        }

        if let Some(initial) = def.initial_state {
            self.set_initial_state(&id, &initial)?;
        }

        Ok(id)
    }
}
