//! In-memory [`PermissionBackend`].
//!
//! Actors hold roles either globally or locally on one entity. Grants are
//! (role, permission) pairs stored per entity. An actor holds a permission
//! on an entity iff one of its roles there has that permission granted.

use super::{PermissionBackend, RoleScope};
use crate::store::{StoreError, StoreResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use workflow_types::{Actor, ActorId, EntityRef, PermissionGrant, PermissionId, RoleId};

#[derive(Default)]
struct Tables {
    global_roles: HashMap<ActorId, BTreeSet<RoleId>>,
    local_roles: HashMap<(ActorId, EntityRef), BTreeSet<RoleId>>,
    grants: HashMap<EntityRef, BTreeSet<PermissionGrant>>,
}

impl Tables {
    fn roles_of(&self, actor: &ActorId, entity: &EntityRef) -> BTreeSet<RoleId> {
        let mut roles = self.global_roles.get(actor).cloned().unwrap_or_default();
        if let Some(local) = self.local_roles.get(&(actor.clone(), entity.clone())) {
            roles.extend(local.iter().cloned());
        }
        roles
    }
}

/// Reference permission backend backed by in-process maps
#[derive(Default)]
pub struct InMemoryPermissions {
    tables: RwLock<Tables>,
}

impl InMemoryPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give an actor a role on every entity
    pub fn assign_role(
        &self,
        actor: impl Into<ActorId>,
        role: impl Into<RoleId>,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .global_roles
            .entry(actor.into())
            .or_default()
            .insert(role.into());
        Ok(())
    }

    /// Give an actor a role on one entity only
    pub fn assign_local_role(
        &self,
        actor: impl Into<ActorId>,
        entity: &EntityRef,
        role: impl Into<RoleId>,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables
            .local_roles
            .entry((actor.into(), entity.clone()))
            .or_default()
            .insert(role.into());
        Ok(())
    }

    /// Roles an actor holds on an entity, global and local
    pub fn roles_of(&self, actor: &ActorId, entity: &EntityRef) -> StoreResult<Vec<RoleId>> {
        Ok(self.read()?.roles_of(actor, entity).into_iter().collect())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("permission lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("permission lock poisoned".to_string()))
    }
}

impl PermissionBackend for InMemoryPermissions {
    fn has_permission(
        &self,
        entity: &EntityRef,
        actor: &Actor,
        permission: &PermissionId,
    ) -> StoreResult<bool> {
        let tables = self.read()?;
        let Some(grants) = tables.grants.get(entity) else {
            return Ok(false);
        };
        let roles = tables.roles_of(&actor.id, entity);
        Ok(grants
            .iter()
            .any(|g| &g.permission == permission && roles.contains(&g.role)))
    }

    fn grant_permission(
        &self,
        entity: &EntityRef,
        role: &RoleId,
        permission: &PermissionId,
    ) -> StoreResult<bool> {
        let mut tables = self.write()?;
        Ok(tables
            .grants
            .entry(entity.clone())
            .or_default()
            .insert(PermissionGrant {
                role: role.clone(),
                permission: permission.clone(),
            }))
    }

    fn remove_permissions(
        &self,
        entity: &EntityRef,
        roles: RoleScope<'_>,
        permissions: &[PermissionId],
    ) -> StoreResult<usize> {
        let mut tables = self.write()?;
        let Some(grants) = tables.grants.get_mut(entity) else {
            return Ok(0);
        };
        let before = grants.len();
        grants.retain(|g| !(roles.includes(&g.role) && permissions.contains(&g.permission)));
        Ok(before - grants.len())
    }

    fn reset(&self, entity: &EntityRef) -> StoreResult<usize> {
        let mut tables = self.write()?;
        let removed = tables.grants.remove(entity).map(|g| g.len()).unwrap_or(0);
        Ok(removed)
    }

    fn permissions_of(&self, entity: &EntityRef) -> StoreResult<Vec<PermissionGrant>> {
        Ok(self
            .read()?
            .grants
            .get(entity)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default())
    }
}
