//! Caching layer for signing-key resolution.
//!
//! Every token verification needs the public key named by the token's
//! `kid` header, and key records change only at rotation, so reads are
//! served from a TTL cache in front of the [`SigningKeyStore`].
//!
//! The cache is strictly advisory. [`CachingKeyResolver`] treats every
//! cache failure as a miss and falls through to the store, so a broken
//! cache degrades latency, never correctness.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use fail::fail_point;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use tessera_storage::{KeyId, SigningKeyStore, StorageError, StorageResult, Zeroizing};

use crate::{
    error::{AuthError, Result},
    jwt::{KeyResolver, decoding_key_from_pem},
};

/// Default time-to-live for cached key material.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached keys.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Cache for public signing-key PEMs, keyed by key ID.
///
/// Values are PEM strings rather than parsed [`DecodingKey`]s so that
/// implementations backed by an external cache can store them as-is.
/// Implementations may fail; callers must treat failures as misses, not
/// as authentication failures.
#[async_trait]
pub trait KeyCache: Send + Sync {
    /// Looks up the cached PEM for `key_id`.
    async fn get(&self, key_id: KeyId) -> StorageResult<Option<Zeroizing<String>>>;

    /// Caches the PEM for `key_id`.
    async fn insert(&self, key_id: KeyId, public_key_pem: Zeroizing<String>) -> StorageResult<()>;
}

/// In-process [`KeyCache`] with TTL and capacity-bounded eviction.
pub struct MokaKeyCache {
    cache: Cache<KeyId, Zeroizing<String>>,
}

impl MokaKeyCache {
    /// Creates a cache with the given TTL and the default capacity.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache with the given TTL and maximum entry count.
    #[must_use]
    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        Self { cache: Cache::builder().time_to_live(ttl).max_capacity(max_capacity).build() }
    }

    /// Approximate number of cached entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Flushes pending cache maintenance so counts and evictions are
    /// visible. Intended for tests.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[async_trait]
impl KeyCache for MokaKeyCache {
    async fn get(&self, key_id: KeyId) -> StorageResult<Option<Zeroizing<String>>> {
        fail_point!("key-cache-before-get", |_| {
            Err(StorageError::internal("injected failure before key cache read"))
        });
        Ok(self.cache.get(&key_id).await)
    }

    async fn insert(&self, key_id: KeyId, public_key_pem: Zeroizing<String>) -> StorageResult<()> {
        fail_point!("key-cache-before-insert", |_| {
            Err(StorageError::internal("injected failure before key cache write"))
        });
        self.cache.insert(key_id, public_key_pem).await;
        Ok(())
    }
}

/// [`KeyResolver`] that checks a [`KeyCache`] before the backing store.
///
/// Store results are written back to the cache on the way out. Unknown
/// keys are not negatively cached: a token with a bogus `kid` costs one
/// store round trip each time, and a key registered moments ago becomes
/// resolvable immediately.
pub struct CachingKeyResolver {
    cache: Arc<dyn KeyCache>,
    store: Arc<dyn SigningKeyStore>,
}

impl CachingKeyResolver {
    /// Creates a resolver over the given cache and store.
    #[must_use]
    pub fn new(cache: Arc<dyn KeyCache>, store: Arc<dyn SigningKeyStore>) -> Self {
        Self { cache, store }
    }
}

#[async_trait]
impl KeyResolver for CachingKeyResolver {
    #[tracing::instrument(skip(self))]
    async fn resolve_key(&self, key_id: KeyId) -> Result<DecodingKey> {
        match self.cache.get(key_id).await {
            Ok(Some(pem)) => match decoding_key_from_pem(&pem) {
                Ok(key) => {
                    tracing::debug!("key cache hit");
                    return Ok(key);
                }
                Err(error) => {
                    tracing::warn!(error = %error, "cached key material rejected, refetching");
                }
            },
            Ok(None) => {
                tracing::debug!("key cache miss");
            }
            Err(error) => {
                tracing::warn!(error = %error, "key cache read failed, treating as miss");
            }
        }

        fail_point!("resolver-before-store-fetch", |_| {
            Err(AuthError::storage(StorageError::internal(
                "injected failure before signing key fetch",
            )))
        });

        let record = self
            .store
            .resolve(key_id)
            .await?
            .ok_or_else(|| AuthError::key_not_found(key_id.to_string()))?;
        let decoding_key = decoding_key_from_pem(&record.public_key)?;

        if let Err(error) = self.cache.insert(key_id, record.public_key).await {
            tracing::warn!(error = %error, "key cache write failed, continuing uncached");
        }

        Ok(decoding_key)
    }
}
