//! Revoked-token persistence.
//!
//! A revocation row is `{token_id, expire_at}` and exists for at most the
//! natural lifetime of the token it blacklists. `expire_at` is copied from
//! the token at revocation time, so once it passes the original token can
//! no longer verify anyway and the row is dead weight. A periodic sweep
//! deletes those rows in bulk.
//!
//! Token IDs are time-ordered Snowflakes and never reused, which is what
//! makes the primary key safe to use as an idempotency key: the first
//! insert wins, every later insert of the same ID is rejected.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    types::TokenId,
};

/// A blacklisted token row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevokedToken {
    /// ID of the revoked token (primary key).
    pub token_id: TokenId,

    /// Expiry of the original token; the row is sweepable after this.
    pub expire_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Creates a new revocation row.
    #[must_use]
    pub fn new(token_id: TokenId, expire_at: DateTime<Utc>) -> Self {
        Self { token_id, expire_at }
    }
}

/// Persistence layer for the revocation blacklist.
///
/// The contract every backend must honor: [`insert_if_absent`] is atomic
/// check-then-insert. When two writers race on the same `token_id`, exactly
/// one insert succeeds and the loser observes
/// [`StorageError::AlreadyExists`]. Relational backends get this from a row
/// lock plus the primary-key constraint; the in-memory backend from a
/// single write lock over the map.
///
/// [`insert_if_absent`]: RevocationStore::insert_if_absent
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Inserts a revocation row if no row for its `token_id` exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the token is already
    /// revoked. Never silently succeeds on a duplicate.
    async fn insert_if_absent(&self, entry: RevokedToken) -> StorageResult<()>;

    /// Whether a revocation row exists for `token_id`.
    async fn contains(&self, token_id: TokenId) -> StorageResult<bool>;

    /// Deletes every row with `expire_at <= cutoff` and returns how many
    /// rows were deleted.
    ///
    /// The cutoff comparison is inclusive: a row expiring exactly at
    /// `cutoff` is deleted.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}

/// In-memory implementation of [`RevocationStore`] for testing.
///
/// A single write lock over the map serializes concurrent revocations, so
/// occupancy of the map entry plays the role a primary-key constraint plays
/// in a relational backend.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use tessera_storage::{MemoryRevocationStore, RevocationStore, RevokedToken, TokenId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRevocationStore::new();
///     let entry = RevokedToken::new(TokenId::from(42), Utc::now() + Duration::hours(1));
///
///     store.insert_if_absent(entry).await?;
///     assert!(store.contains(entry.token_id).await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryRevocationStore {
    /// Revocation rows indexed by token ID.
    entries: Arc<RwLock<HashMap<TokenId, RevokedToken>>>,
}

impl MemoryRevocationStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revocation rows currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    #[tracing::instrument(skip(self), fields(token_id = %entry.token_id))]
    async fn insert_if_absent(&self, entry: RevokedToken) -> StorageResult<()> {
        use std::collections::hash_map::Entry;

        let mut entries = self.entries.write();
        match entries.entry(entry.token_id) {
            Entry::Occupied(_) => {
                Err(StorageError::already_exists(format!("revoked_token/{}", entry.token_id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn contains(&self, token_id: TokenId) -> StorageResult<bool> {
        let entries = self.entries.read();
        Ok(entries.contains_key(&token_id))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expire_at > cutoff);
        let deleted = (before - entries.len()) as u64;

        if deleted > 0 {
            tracing::debug!(deleted, "swept expired revocation rows");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn entry(id: i64, expire_at: DateTime<Utc>) -> RevokedToken {
        RevokedToken::new(TokenId::from(id), expire_at)
    }

    #[tokio::test]
    async fn test_insert_then_contains() {
        let store = MemoryRevocationStore::new();
        let now = Utc::now();

        store.insert_if_absent(entry(1, now + Duration::hours(1))).await.unwrap();

        assert!(store.contains(TokenId::from(1)).await.unwrap());
        assert!(!store.contains(TokenId::from(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryRevocationStore::new();
        let now = Utc::now();

        store.insert_if_absent(entry(7, now)).await.unwrap();
        let err = store.insert_if_absent(entry(7, now)).await.unwrap_err();

        assert!(
            matches!(err, StorageError::AlreadyExists { .. }),
            "expected AlreadyExists, got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_concurrent_revocations_admit_exactly_one() {
        let store = MemoryRevocationStore::new();
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_if_absent(entry(99, now + Duration::hours(1))).await
            }));
        }

        let mut ok = 0;
        let mut already_exists = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(StorageError::AlreadyExists { .. }) => already_exists += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(already_exists, 7);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_deletes_at_or_before_cutoff() {
        let store = MemoryRevocationStore::new();
        let cutoff = Utc::now();

        store.insert_if_absent(entry(1, cutoff - Duration::seconds(10))).await.unwrap();
        store.insert_if_absent(entry(2, cutoff)).await.unwrap();
        store.insert_if_absent(entry(3, cutoff + Duration::seconds(10))).await.unwrap();

        let deleted = store.delete_expired(cutoff).await.unwrap();

        // Exactly-at-cutoff rows are swept along with older ones.
        assert_eq!(deleted, 2);
        assert!(!store.contains(TokenId::from(1)).await.unwrap());
        assert!(!store.contains(TokenId::from(2)).await.unwrap());
        assert!(store.contains(TokenId::from(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_of_empty_store_deletes_nothing() {
        let store = MemoryRevocationStore::new();

        let deleted = store.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_token_is_revocable_again_after_sweep() {
        // A swept row frees the ID, but Snowflake IDs are never reissued,
        // so this only matters for the store contract, not for callers.
        let store = MemoryRevocationStore::new();
        let now = Utc::now();

        store.insert_if_absent(entry(5, now)).await.unwrap();
        store.delete_expired(now).await.unwrap();

        store.insert_if_absent(entry(5, now + Duration::hours(1))).await.unwrap();
        assert!(store.contains(TokenId::from(5)).await.unwrap());
    }
}
