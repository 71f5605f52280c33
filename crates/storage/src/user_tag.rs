//! User-to-tag membership persistence.
//!
//! Shaped like the user-role store, with the same pair-uniqueness
//! contract, but walked by nothing: tags label users and that is all.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::{StorageError, StorageResult},
    types::{TagId, UserId},
};

/// Persistence layer for user-tag assignments.
#[async_trait]
pub trait UserTagStore: Send + Sync {
    /// Attaches a tag to a user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the pair already exists.
    async fn add(&self, user_id: UserId, tag_id: TagId) -> StorageResult<()>;

    /// Detaches a tag from a user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the pair does not exist.
    async fn remove(&self, user_id: UserId, tag_id: TagId) -> StorageResult<()>;

    /// Whether the user currently carries the tag.
    async fn contains(&self, user_id: UserId, tag_id: TagId) -> StorageResult<bool>;

    /// IDs of the tags attached to a user, in attachment order.
    async fn tags_of(&self, user_id: UserId) -> StorageResult<Vec<TagId>>;

    /// Batched [`tags_of`](Self::tags_of) over several users.
    ///
    /// The result has the same length and order as `user_ids`, with an
    /// empty list for any user that carries no tags or does not exist.
    async fn tags_of_many(&self, user_ids: &[UserId]) -> StorageResult<Vec<Vec<TagId>>>;
}

#[derive(Debug, Default)]
struct Inner {
    pairs: HashSet<(UserId, TagId)>,
    by_user: HashMap<UserId, Vec<TagId>>,
}

/// In-memory implementation of [`UserTagStore`] for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserTagStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryUserTagStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserTagStore for MemoryUserTagStore {
    #[tracing::instrument(skip(self))]
    async fn add(&self, user_id: UserId, tag_id: TagId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.insert((user_id, tag_id)) {
            return Err(StorageError::already_exists(format!("user_tag/{user_id}/{tag_id}")));
        }
        inner.by_user.entry(user_id).or_default().push(tag_id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, user_id: UserId, tag_id: TagId) -> StorageResult<()> {
        let mut inner = self.inner.write();

        if !inner.pairs.remove(&(user_id, tag_id)) {
            return Err(StorageError::not_found(format!("user_tag/{user_id}/{tag_id}")));
        }
        if let Some(tags) = inner.by_user.get_mut(&user_id) {
            tags.retain(|tag| *tag != tag_id);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn contains(&self, user_id: UserId, tag_id: TagId) -> StorageResult<bool> {
        let inner = self.inner.read();
        Ok(inner.pairs.contains(&(user_id, tag_id)))
    }

    #[tracing::instrument(skip(self))]
    async fn tags_of(&self, user_id: UserId) -> StorageResult<Vec<TagId>> {
        let inner = self.inner.read();
        Ok(inner.by_user.get(&user_id).cloned().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn tags_of_many(&self, user_ids: &[UserId]) -> StorageResult<Vec<Vec<TagId>>> {
        let inner = self.inner.read();
        Ok(user_ids
            .iter()
            .map(|user_id| inner.by_user.get(user_id).cloned().unwrap_or_default())
            .collect())
    }
}
