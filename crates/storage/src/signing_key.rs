//! Signing key persistence.
//!
//! Only the public half of a signing keypair is ever persisted. The private
//! half lives in the memory of the process that generated it and dies with
//! that process. Registered keys are append-only and immutable: rotation
//! registers a new key, it never touches old ones, so every token signed
//! under an earlier key stays verifiable for its whole lifetime.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{error::StorageResult, types::KeyId};

/// A registered public signing key.
///
/// The key material is PEM-encoded SPKI text, exactly as handed to
/// [`SigningKeyStore::register`]. Wrapped in [`Zeroizing`] so the material
/// is zeroed from memory when the record is dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningKeyRecord {
    /// Store-assigned key ID, carried in token `kid` headers.
    pub key_id: KeyId,

    /// PEM-encoded public key.
    pub public_key: Zeroizing<String>,
}

impl SigningKeyRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(key_id: KeyId, public_key: impl Into<String>) -> Self {
        Self { key_id, public_key: Zeroizing::new(public_key.into()) }
    }
}

/// Persistence layer for public signing keys.
///
/// Keys are append-only: there is no update or delete operation, and a
/// registered key must stay resolvable indefinitely. Implementations can
/// use different backends (a relational table in production, in-memory
/// for testing).
///
/// # Error Handling
///
/// Operations return [`StorageResult`](crate::StorageResult); backends map
/// their internal failures onto
/// [`StorageError`](crate::StorageError) variants.
#[async_trait]
pub trait SigningKeyStore: Send + Sync {
    /// Persists a new public key and returns its assigned ID.
    ///
    /// The ID is stable for the lifetime of the store and is what issued
    /// tokens carry in their `kid` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend is unavailable.
    async fn register(&self, public_key: &str) -> StorageResult<KeyId>;

    /// Retrieves a registered key by ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the key exists
    /// - `Ok(None)` if no key was registered under `key_id`
    /// - `Err(...)` on storage errors
    async fn resolve(&self, key_id: KeyId) -> StorageResult<Option<SigningKeyRecord>>;
}

/// In-memory implementation of [`SigningKeyStore`] for testing.
///
/// Stores keys in a thread-safe hash map and assigns IDs from a process-local
/// sequence. It does not persist data between restarts.
///
/// # Examples
///
/// ```
/// use tessera_storage::{MemorySigningKeyStore, SigningKeyStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySigningKeyStore::new();
///
///     let key_id = store.register("-----BEGIN PUBLIC KEY-----\n...").await?;
///
///     let record = store.resolve(key_id).await?;
///     assert!(record.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySigningKeyStore {
    /// Registered keys indexed by assigned ID.
    keys: Arc<RwLock<HashMap<KeyId, SigningKeyRecord>>>,

    /// Last assigned key ID; the sequence starts at 1.
    last_id: Arc<AtomicI64>,
}

impl MemorySigningKeyStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SigningKeyStore for MemorySigningKeyStore {
    #[tracing::instrument(skip(self, public_key))]
    async fn register(&self, public_key: &str) -> StorageResult<KeyId> {
        let key_id = KeyId::from(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = SigningKeyRecord::new(key_id, public_key);

        let mut keys = self.keys.write();
        keys.insert(key_id, record);

        tracing::debug!(key_id = %key_id, "registered signing key");
        Ok(key_id)
    }

    #[tracing::instrument(skip(self))]
    async fn resolve(&self, key_id: KeyId) -> StorageResult<Option<SigningKeyRecord>> {
        let keys = self.keys.read();
        Ok(keys.get(&key_id).cloned())
    }
}
