//! Role persistence.
//!
//! Roles are the middle of the access graph: users are assigned roles,
//! roles are granted permissions. The rows themselves are plain records;
//! the membership edges live in the association stores.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    pagination::{self, PageRequest, RowFilter, SortDirection},
    types::RoleId,
};

/// A role row.
///
/// # Example
///
/// ```
/// use tessera_storage::RoleRecord;
///
/// let role = RoleRecord::builder()
///     .id(10)
///     .display_name("Operators")
///     .description("Can manage machine fleets".to_owned())
///     .build();
///
/// assert_eq!(role.description.as_deref(), Some("Can manage machine fleets"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct RoleRecord {
    /// Role ID (primary key).
    #[builder(into)]
    pub id: RoleId,

    /// Human-readable name shown in listings. Not unique.
    #[builder(into)]
    pub display_name: String,

    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Sort orders supported by role listings.
///
/// Every order tie-breaks on the role ID in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleOrder {
    /// By role ID, smallest first.
    IdAscending,
    /// By role ID, largest first.
    IdDescending,
    /// By display name, lexicographic.
    DisplayNameAscending,
    /// By display name, reverse lexicographic.
    DisplayNameDescending,
}

/// Persistence layer for roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Persists a new role.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the ID is already taken.
    async fn create(&self, role: &RoleRecord) -> StorageResult<()>;

    /// Retrieves a role by ID.
    async fn get(&self, id: RoleId) -> StorageResult<Option<RoleRecord>>;

    /// Retrieves several roles at once, aligned with `ids`.
    async fn get_many(&self, ids: &[RoleId]) -> StorageResult<Vec<Option<RoleRecord>>>;

    /// Counts roles matching the filter, or all roles without one.
    async fn count(&self, filter: Option<RowFilter<RoleRecord>>) -> StorageResult<u64>;

    /// Returns one page of roles under the keyset contract.
    async fn list(
        &self,
        page: PageRequest,
        order: RoleOrder,
        filter: Option<RowFilter<RoleRecord>>,
    ) -> StorageResult<Vec<RoleRecord>>;
}

/// In-memory implementation of [`RoleStore`] for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoleStore {
    rows: Arc<RwLock<HashMap<RoleId, RoleRecord>>>,
}

impl MemoryRoleStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    #[tracing::instrument(skip(self, role), fields(id = %role.id))]
    async fn create(&self, role: &RoleRecord) -> StorageResult<()> {
        let mut rows = self.rows.write();

        if rows.contains_key(&role.id) {
            return Err(StorageError::already_exists(format!("role/{}", role.id)));
        }
        rows.insert(role.id, role.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: RoleId) -> StorageResult<Option<RoleRecord>> {
        let rows = self.rows.read();
        Ok(rows.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(&self, ids: &[RoleId]) -> StorageResult<Vec<Option<RoleRecord>>> {
        let rows = self.rows.read();
        Ok(ids.iter().map(|id| rows.get(id).cloned()).collect())
    }

    #[tracing::instrument(skip(self, filter))]
    async fn count(&self, filter: Option<RowFilter<RoleRecord>>) -> StorageResult<u64> {
        let rows = self.rows.read();
        let count = rows.values().filter(|row| filter.as_ref().is_none_or(|f| f(row))).count();
        Ok(count as u64)
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(
        &self,
        page: PageRequest,
        order: RoleOrder,
        filter: Option<RowFilter<RoleRecord>>,
    ) -> StorageResult<Vec<RoleRecord>> {
        let rows = self.rows.read();
        let snapshot: Vec<&RoleRecord> =
            rows.values().filter(|row| filter.as_ref().is_none_or(|f| f(row))).collect();

        let page_rows = match order {
            RoleOrder::IdAscending => pagination::list_page(
                &snapshot,
                |role| role.id.0,
                |role| role.id.0,
                SortDirection::Ascending,
                page,
            ),
            RoleOrder::IdDescending => pagination::list_page(
                &snapshot,
                |role| role.id.0,
                |role| role.id.0,
                SortDirection::Descending,
                page,
            ),
            RoleOrder::DisplayNameAscending => pagination::list_page(
                &snapshot,
                |role| role.display_name.clone(),
                |role| role.id.0,
                SortDirection::Ascending,
                page,
            ),
            RoleOrder::DisplayNameDescending => pagination::list_page(
                &snapshot,
                |role| role.display_name.clone(),
                |role| role.id.0,
                SortDirection::Descending,
                page,
            ),
        };

        Ok(page_rows.into_iter().cloned().collect())
    }
}
