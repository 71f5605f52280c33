//! Role-to-permission grant persistence.
//!
//! Each row is a `(role_id, permission_id)` pair with a uniqueness
//! constraint over the pair. Grant order is preserved per role so that
//! permission resolution is deterministic.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::{StorageError, StorageResult},
    types::{PermissionId, RoleId},
};

/// Persistence layer for role-permission grants.
///
/// [`add`](RolePermissionStore::add) has the same atomic check-then-insert
/// contract as the other pair stores: concurrent duplicate grants admit
/// exactly one winner.
#[async_trait]
pub trait RolePermissionStore: Send + Sync {
    /// Grants a permission to a role.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the pair already exists.
    async fn add(&self, role_id: RoleId, permission_id: PermissionId) -> StorageResult<()>;

    /// Removes a grant.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the pair does not exist.
    async fn remove(&self, role_id: RoleId, permission_id: PermissionId) -> StorageResult<()>;

    /// Whether the role currently holds the permission.
    async fn contains(&self, role_id: RoleId, permission_id: PermissionId)
    -> StorageResult<bool>;

    /// IDs of the permissions granted to a role, in grant order.
    async fn permissions_of(&self, role_id: RoleId) -> StorageResult<Vec<PermissionId>>;

    /// Batched [`permissions_of`](Self::permissions_of) over several roles.
    ///
    /// The result has the same length and order as `role_ids`, with an
    /// empty list for any role that has no grants or does not exist.
    async fn permissions_of_many(
        &self,
        role_ids: &[RoleId],
    ) -> StorageResult<Vec<Vec<PermissionId>>>;
}

#[derive(Debug, Default)]
struct Inner {
    pairs: HashSet<(RoleId, PermissionId)>,
    by_role: HashMap<RoleId, Vec<PermissionId>>,
}

/// In-memory implementation of [`RolePermissionStore`] for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryRolePermissionStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRolePermissionStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RolePermissionStore for MemoryRolePermissionStore {
    #[tracing::instrument(skip(self))]
    async fn add(&self, role_id: RoleId, permission_id: PermissionId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.insert((role_id, permission_id)) {
            return Err(StorageError::already_exists(format!(
                "role_permission/{role_id}/{permission_id}"
            )));
        }
        inner.by_role.entry(role_id).or_default().push(permission_id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, role_id: RoleId, permission_id: PermissionId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.remove(&(role_id, permission_id)) {
            return Err(StorageError::not_found(format!(
                "role_permission/{role_id}/{permission_id}"
            )));
        }
        if let Some(permissions) = inner.by_role.get_mut(&role_id) {
            permissions.retain(|permission| *permission != permission_id);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn contains(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StorageResult<bool> {
        let inner = self.inner.read();
        Ok(inner.pairs.contains(&(role_id, permission_id)))
    }

    #[tracing::instrument(skip(self))]
    async fn permissions_of(&self, role_id: RoleId) -> StorageResult<Vec<PermissionId>> {
        let inner = self.inner.read();
        Ok(inner.by_role.get(&role_id).cloned().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, role_ids), fields(count = role_ids.len()))]
    async fn permissions_of_many(
        &self,
        role_ids: &[RoleId],
    ) -> StorageResult<Vec<Vec<PermissionId>>> {
        let inner = self.inner.read();
        Ok(role_ids
            .iter()
            .map(|role_id| inner.by_role.get(role_id).cloned().unwrap_or_default())
            .collect())
    }
}
