//! Permission persistence.
//!
//! Permissions are named capabilities. The name is the business key:
//! dotted lowercase segments such as `fleet.machines.read`, unique across
//! all permissions. Access checks compare names, so the store indexes them
//! alongside the primary key.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    types::PermissionId,
};

/// A permission row.
///
/// # Example
///
/// ```
/// use tessera_storage::PermissionRecord;
///
/// let perm = PermissionRecord::builder()
///     .id(1)
///     .name("fleet.machines.read")
///     .build();
///
/// assert_eq!(perm.name, "fleet.machines.read");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct PermissionRecord {
    /// Permission ID (primary key).
    #[builder(into)]
    pub id: PermissionId,

    /// Permission name, unique, in dotted-segment form.
    #[builder(into)]
    pub name: String,

    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Persistence layer for permissions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Persists a new permission.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the ID or the name is
    /// already taken.
    async fn create(&self, permission: &PermissionRecord) -> StorageResult<()>;

    /// Retrieves a permission by ID.
    async fn get(&self, id: PermissionId) -> StorageResult<Option<PermissionRecord>>;

    /// Retrieves a permission by unique name.
    async fn get_by_name(&self, name: &str) -> StorageResult<Option<PermissionRecord>>;

    /// Retrieves several permissions at once.
    ///
    /// The result has the same length and order as `ids`, with `None` at
    /// the positions of unknown IDs. Permission resolution batches through
    /// this instead of issuing one lookup per granted permission.
    async fn get_many(&self, ids: &[PermissionId])
    -> StorageResult<Vec<Option<PermissionRecord>>>;
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<PermissionId, PermissionRecord>,
    by_name: HashMap<String, PermissionId>,
}

/// In-memory implementation of [`PermissionStore`] for testing.
///
/// The name uniqueness constraint is enforced by a secondary index updated
/// under the same write lock as the row map.
#[derive(Debug, Default, Clone)]
pub struct MemoryPermissionStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryPermissionStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    #[tracing::instrument(skip(self, permission), fields(id = %permission.id, name = %permission.name))]
    async fn create(&self, permission: &PermissionRecord) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if inner.rows.contains_key(&permission.id) {
            return Err(StorageError::already_exists(format!("permission/{}", permission.id)));
        }
        if inner.by_name.contains_key(&permission.name) {
            return Err(StorageError::already_exists(format!(
                "permission/name/{}",
                permission.name
            )));
        }

        inner.by_name.insert(permission.name.clone(), permission.id);
        inner.rows.insert(permission.id, permission.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: PermissionId) -> StorageResult<Option<PermissionRecord>> {
        let inner = self.inner.read();
        Ok(inner.rows.get(&id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_name(&self, name: &str) -> StorageResult<Option<PermissionRecord>> {
        let inner = self.inner.read();
        Ok(inner.by_name.get(name).and_then(|id| inner.rows.get(id)).cloned())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(
        &self,
        ids: &[PermissionId],
    ) -> StorageResult<Vec<Option<PermissionRecord>>> {
        let inner = self.inner.read();
        Ok(ids.iter().map(|id| inner.rows.get(id).cloned()).collect())
    }
}
