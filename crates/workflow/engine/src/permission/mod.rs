//! Permission collaborator and gate
//!
//! The engine never decides who holds what on its own. It asks a
//! [`PermissionBackend`] and, when recomputing, tells it which role holds
//! which permission on an entity. A host entity may short-circuit the
//! check by exposing a [`PermissionCheck`](workflow_types::PermissionCheck).

pub mod memory;

pub use memory::InMemoryPermissions;

use crate::store::StoreResult;
use std::sync::Arc;
use workflow_types::{Actor, EntityRef, PermissionGrant, PermissionId, RoleId, WorkflowEntity};

/// Which roles a bulk revoke applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleScope<'a> {
    All,
    Only(&'a [RoleId]),
}

impl RoleScope<'_> {
    pub fn includes(&self, role: &RoleId) -> bool {
        match self {
            Self::All => true,
            Self::Only(roles) => roles.contains(role),
        }
    }
}

/// Interface to the host's role/permission subsystem
pub trait PermissionBackend: Send + Sync {
    /// Whether `actor` holds `permission` on `entity` through any of its roles
    fn has_permission(
        &self,
        entity: &EntityRef,
        actor: &Actor,
        permission: &PermissionId,
    ) -> StoreResult<bool>;

    /// Grant `permission` to `role` on `entity`. Returns `true` if newly granted.
    fn grant_permission(
        &self,
        entity: &EntityRef,
        role: &RoleId,
        permission: &PermissionId,
    ) -> StoreResult<bool>;

    /// Bulk revoke. Returns the number of grants removed.
    fn remove_permissions(
        &self,
        entity: &EntityRef,
        roles: RoleScope<'_>,
        permissions: &[PermissionId],
    ) -> StoreResult<usize>;

    /// Revoke everything granted on `entity`
    fn reset(&self, entity: &EntityRef) -> StoreResult<usize>;

    /// Every (role, permission) grant currently held on `entity`, sorted
    fn permissions_of(&self, entity: &EntityRef) -> StoreResult<Vec<PermissionGrant>>;
}

/// Answers "may this actor act on this entity?", honouring the entity's
/// own check first
#[derive(Clone)]
pub struct PermissionGate {
    backend: Arc<dyn PermissionBackend>,
}

impl PermissionGate {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn PermissionBackend> {
        &self.backend
    }

    pub fn check(
        &self,
        entity: &dyn WorkflowEntity,
        actor: &Actor,
        permission: &PermissionId,
    ) -> StoreResult<bool> {
        if let Some(check) = entity.permission_check() {
            return Ok(check.has_permission(actor, permission));
        }
        self.backend
            .has_permission(&entity.entity_ref(), actor, permission)
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}
