//! User account persistence.
//!
//! Users are created by account management and only referenced here: token
//! subjects point at them, role and tag assignments attach to them, and the
//! listing surface pages over them. Nothing in this crate mutates a user
//! row after creation.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    pagination::{self, PageRequest, RowFilter, SortDirection},
    types::UserId,
};

/// A user account row.
///
/// # Example
///
/// ```
/// use tessera_storage::{UserId, UserRecord};
///
/// let user = UserRecord::builder()
///     .id(1)
///     .username("ada")
///     .display_name("Ada Lovelace")
///     .build();
///
/// assert_eq!(user.id, UserId::from(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    /// User ID (primary key).
    #[builder(into)]
    pub id: UserId,

    /// Login name, unique across all users.
    #[builder(into)]
    pub username: String,

    /// Human-readable name shown in listings. Not unique.
    #[builder(into)]
    pub display_name: String,
}

/// Sort orders supported by user listings.
///
/// Every order tie-breaks on the user ID in the same direction, so the
/// order is total even when usernames or display names collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOrder {
    /// By user ID, smallest first.
    IdAscending,
    /// By user ID, largest first.
    IdDescending,
    /// By username, lexicographic.
    UsernameAscending,
    /// By username, reverse lexicographic.
    UsernameDescending,
    /// By display name, lexicographic.
    DisplayNameAscending,
    /// By display name, reverse lexicographic.
    DisplayNameDescending,
}

/// Persistence layer for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the ID or the username
    /// is already taken.
    async fn create(&self, user: &UserRecord) -> StorageResult<()>;

    /// Retrieves a user by ID.
    async fn get(&self, id: UserId) -> StorageResult<Option<UserRecord>>;

    /// Retrieves a user by unique username.
    async fn get_by_username(&self, username: &str) -> StorageResult<Option<UserRecord>>;

    /// Retrieves several users at once.
    ///
    /// The result has the same length and order as `ids`, with `None` at
    /// the positions of unknown IDs.
    async fn get_many(&self, ids: &[UserId]) -> StorageResult<Vec<Option<UserRecord>>>;

    /// Counts users matching the filter, or all users without one.
    async fn count(&self, filter: Option<RowFilter<UserRecord>>) -> StorageResult<u64>;

    /// Returns one page of users.
    ///
    /// Pages are stable under the keyset contract: consecutive pages over
    /// a static dataset never skip or repeat a row, for every [`UserOrder`].
    async fn list(
        &self,
        page: PageRequest,
        order: UserOrder,
        filter: Option<RowFilter<UserRecord>>,
    ) -> StorageResult<Vec<UserRecord>>;
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<UserId, UserRecord>,
    by_username: HashMap<String, UserId>,
}

/// In-memory implementation of [`UserStore`] for testing.
///
/// The username uniqueness constraint is enforced by a secondary index
/// updated under the same write lock as the row map.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryUserStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    #[tracing::instrument(skip(self, user), fields(id = %user.id, username = %user.username))]
    async fn create(&self, user: &UserRecord) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if inner.rows.contains_key(&user.id) {
            return Err(StorageError::already_exists(format!("user/{}", user.id)));
        }
        if inner.by_username.contains_key(&user.username) {
            return Err(StorageError::already_exists(format!("user/username/{}", user.username)));
        }

        inner.by_username.insert(user.username.clone(), user.id);
        inner.rows.insert(user.id, user.clone());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        let inner = self.inner.read();
        Ok(inner.rows.get(&id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_username(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        let inner = self.inner.read();
        Ok(inner.by_username.get(username).and_then(|id| inner.rows.get(id)).cloned())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(&self, ids: &[UserId]) -> StorageResult<Vec<Option<UserRecord>>> {
        let inner = self.inner.read();
        Ok(ids.iter().map(|id| inner.rows.get(id).cloned()).collect())
    }

    #[tracing::instrument(skip(self, filter))]
    async fn count(&self, filter: Option<RowFilter<UserRecord>>) -> StorageResult<u64> {
        let inner = self.inner.read();
        let count =
            inner.rows.values().filter(|row| filter.as_ref().is_none_or(|f| f(row))).count();
        Ok(count as u64)
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(
        &self,
        page: PageRequest,
        order: UserOrder,
        filter: Option<RowFilter<UserRecord>>,
    ) -> StorageResult<Vec<UserRecord>> {
        let inner = self.inner.read();
        let rows: Vec<&UserRecord> = inner
            .rows
            .values()
            .filter(|row| filter.as_ref().is_none_or(|f| f(row)))
            .collect();

        let page_rows = match order {
            UserOrder::IdAscending => pagination::list_page(
                &rows,
                |user| user.id.0,
                |user| user.id.0,
                SortDirection::Ascending,
                page,
            ),
            UserOrder::IdDescending => pagination::list_page(
                &rows,
                |user| user.id.0,
                |user| user.id.0,
                SortDirection::Descending,
                page,
            ),
            UserOrder::UsernameAscending => pagination::list_page(
                &rows,
                |user| user.username.clone(),
                |user| user.id.0,
                SortDirection::Ascending,
                page,
            ),
            UserOrder::UsernameDescending => pagination::list_page(
                &rows,
                |user| user.username.clone(),
                |user| user.id.0,
                SortDirection::Descending,
                page,
            ),
            UserOrder::DisplayNameAscending => pagination::list_page(
                &rows,
                |user| user.display_name.clone(),
                |user| user.id.0,
                SortDirection::Ascending,
                page,
            ),
            UserOrder::DisplayNameDescending => pagination::list_page(
                &rows,
                |user| user.display_name.clone(),
                |user| user.id.0,
                SortDirection::Descending,
                page,
            ),
        };

        Ok(page_rows.into_iter().cloned().collect())
    }
}
