//! Permission recomputation
//!
//! Recomputes an entity's workflow-managed grants from scratch: revoke
//! every permission the workflow is responsible for from every role, then
//! grant what the current state configures. Permissions the workflow does
//! not manage are left alone.

use crate::engine::WorkflowEngine;
use crate::error::EngineResult;
use crate::permission::RoleScope;
use workflow_types::EntityRef;

impl WorkflowEngine {
    /// Synchronise an entity's workflow-managed permissions with its
    /// current state. Returns `false` if the entity has no workflow.
    pub fn update_permissions(&self, entity: &EntityRef) -> EngineResult<bool> {
        let Some(workflow) = self.get_workflow(entity)? else {
            return Ok(false);
        };
        let backend = self.permissions();

        let revoked = if workflow.permissions.is_empty() {
            0
        } else {
            backend.remove_permissions(entity, RoleScope::All, &workflow.permissions)?
        };

        let mut granted = 0usize;
        let mut unmanaged = 0usize;
        if let Some(state) = self.get_state(entity)? {
            for grant in &state.grants {
                backend.grant_permission(entity, &grant.role, &grant.permission)?;
                granted += 1;
                if !workflow.is_responsible_for(&grant.permission) {
                    unmanaged += 1;
                }
            }
        }

        // Unmanaged grants are never revoked by later recomputes
        if unmanaged > 0 {
            tracing::warn!(
                entity = %entity,
                workflow = %workflow.id,
                unmanaged,
                "State grants permissions the workflow does not manage"
            );
        }
        tracing::debug!(
            entity = %entity,
            workflow = %workflow.id,
            revoked,
            granted,
            "Permissions recomputed"
        );
        Ok(true)
    }
}
