//! User-to-role membership persistence.
//!
//! Each row is a `(user_id, role_id)` pair with a uniqueness constraint
//! over the pair. Assignment order is preserved per user: permission
//! resolution walks a user's roles in the order they were assigned, so the
//! store has to keep that order, not just the set.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::{StorageError, StorageResult},
    types::{RoleId, UserId},
};

/// Persistence layer for user-role assignments.
///
/// Like the revocation blacklist, [`add`] is atomic check-then-insert:
/// two concurrent assignments of the same pair serialize, one wins, and
/// the loser observes [`StorageError::AlreadyExists`].
///
/// [`add`]: UserRoleStore::add
#[async_trait]
pub trait UserRoleStore: Send + Sync {
    /// Assigns a role to a user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the pair already exists.
    async fn add(&self, user_id: UserId, role_id: RoleId) -> StorageResult<()>;

    /// Removes a role assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the pair does not exist.
    async fn remove(&self, user_id: UserId, role_id: RoleId) -> StorageResult<()>;

    /// Whether the user currently holds the role.
    async fn contains(&self, user_id: UserId, role_id: RoleId) -> StorageResult<bool>;

    /// IDs of the roles assigned to a user, in assignment order.
    ///
    /// Unknown users have no assignments; the result is empty, not an
    /// error.
    async fn roles_of(&self, user_id: UserId) -> StorageResult<Vec<RoleId>>;

    /// Batched [`roles_of`](Self::roles_of) over several users.
    ///
    /// The result has the same length and order as `user_ids`, with an
    /// empty list for any user that has no assignments or does not exist.
    async fn roles_of_many(&self, user_ids: &[UserId]) -> StorageResult<Vec<Vec<RoleId>>>;
}

#[derive(Debug, Default)]
struct Inner {
    pairs: HashSet<(UserId, RoleId)>,
    by_user: HashMap<UserId, Vec<RoleId>>,
}

/// In-memory implementation of [`UserRoleStore`] for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserRoleStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryUserRoleStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRoleStore for MemoryUserRoleStore {
    #[tracing::instrument(skip(self))]
    async fn add(&self, user_id: UserId, role_id: RoleId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.insert((user_id, role_id)) {
            return Err(StorageError::already_exists(format!("user_role/{user_id}/{role_id}")));
        }
        inner.by_user.entry(user_id).or_default().push(role_id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, user_id: UserId, role_id: RoleId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.remove(&(user_id, role_id)) {
            return Err(StorageError::not_found(format!("user_role/{user_id}/{role_id}")));
        }
        if let Some(roles) = inner.by_user.get_mut(&user_id) {
            roles.retain(|role| *role != role_id);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn contains(&self, user_id: UserId, role_id: RoleId) -> StorageResult<bool> {
        let inner = self.inner.read();
        Ok(inner.pairs.contains(&(user_id, role_id)))
    }

    #[tracing::instrument(skip(self))]
    async fn roles_of(&self, user_id: UserId) -> StorageResult<Vec<RoleId>> {
        let inner = self.inner.read();
        Ok(inner.by_user.get(&user_id).cloned().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn roles_of_many(&self, user_ids: &[UserId]) -> StorageResult<Vec<Vec<RoleId>>> {
        let inner = self.inner.read();
        Ok(user_ids
            .iter()
            .map(|user_id| inner.by_user.get(user_id).cloned().unwrap_or_default())
            .collect())
    }
}
