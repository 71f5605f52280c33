//! Fault-injection tests for the key-resolution path.
//!
//! The `failpoints` feature is enabled for tests through this crate's
//! dev-dependency on itself, so these run under a plain `cargo test`.
//! `FailScenario` holds a process-global lock, which keeps failpoint
//! tests serialized and their configurations isolated.
//!
//! The invariant under test: the key cache is advisory. Cache faults may
//! cost extra store reads but never fail verification; only a store fault
//! on a cold cache does.

#![allow(clippy::expect_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fail::FailScenario;
use tessera_authn::{
    AccessTokenOperator, CachingKeyResolver, KeyResolver, MokaKeyCache, TokenConfig,
    TokenIdGenerator, assert_auth_error, testutil,
};
use tessera_storage::{
    KeyId, MemoryRevocationStore, MemorySigningKeyStore, MemoryUserStore, SigningKeyRecord,
    SigningKeyStore, StorageResult, UserId, UserStore, testutil::make_user,
};

/// Counts `resolve` calls so tests can tell cache hits from store reads.
struct CountingKeyStore {
    inner: MemorySigningKeyStore,
    resolves: AtomicUsize,
}

impl CountingKeyStore {
    fn new() -> Self {
        Self { inner: MemorySigningKeyStore::new(), resolves: AtomicUsize::new(0) }
    }

    fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningKeyStore for CountingKeyStore {
    async fn register(&self, public_key: &str) -> StorageResult<KeyId> {
        self.inner.register(public_key).await
    }

    async fn resolve(&self, key_id: KeyId) -> StorageResult<Option<SigningKeyRecord>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(key_id).await
    }
}

#[tokio::test]
async fn test_cache_read_failure_degrades_to_store() {
    let scenario = FailScenario::setup();
    fail::cfg("key-cache-before-get", "return").expect("cfg failpoint");

    let store = Arc::new(CountingKeyStore::new());
    let active_key = testutil::register_test_key(store.as_ref()).await;
    let resolver = CachingKeyResolver::new(
        Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
        store.clone(),
    );

    // Every cache read faults, so every resolution falls through to the
    // store and still succeeds.
    resolver.resolve_key(active_key.key_id()).await.expect("resolution must survive");
    resolver.resolve_key(active_key.key_id()).await.expect("resolution must survive");
    assert_eq!(store.resolve_count(), 2);

    scenario.teardown();
}

#[tokio::test]
async fn test_cache_write_failure_keeps_resolution_working() {
    let scenario = FailScenario::setup();
    fail::cfg("key-cache-before-insert", "return").expect("cfg failpoint");

    let store = Arc::new(CountingKeyStore::new());
    let active_key = testutil::register_test_key(store.as_ref()).await;
    let resolver = CachingKeyResolver::new(
        Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
        store.clone(),
    );

    // Nothing ever lands in the cache, so each resolution is a store
    // read, but none of them fail.
    resolver.resolve_key(active_key.key_id()).await.expect("resolution must survive");
    resolver.resolve_key(active_key.key_id()).await.expect("resolution must survive");
    assert_eq!(store.resolve_count(), 2);

    scenario.teardown();
}

#[tokio::test]
async fn test_store_failure_propagates_on_cold_cache() {
    let scenario = FailScenario::setup();

    let store = Arc::new(CountingKeyStore::new());
    let active_key = testutil::register_test_key(store.as_ref()).await;
    let resolver = CachingKeyResolver::new(
        Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
        store,
    );

    fail::cfg("resolver-before-store-fetch", "return").expect("cfg failpoint");

    let result = resolver.resolve_key(active_key.key_id()).await;
    assert_auth_error!(result, Storage, "cold-cache store outage must surface");

    scenario.teardown();
}

#[tokio::test]
async fn test_warm_cache_survives_store_outage() {
    let scenario = FailScenario::setup();

    let store = Arc::new(CountingKeyStore::new());
    let active_key = testutil::register_test_key(store.as_ref()).await;
    let resolver = CachingKeyResolver::new(
        Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
        store.clone(),
    );

    // Warm the cache while the store is healthy.
    resolver.resolve_key(active_key.key_id()).await.expect("warmup");
    assert_eq!(store.resolve_count(), 1);

    // Store goes down; cached key material keeps verification alive.
    fail::cfg("resolver-before-store-fetch", "return").expect("cfg failpoint");
    resolver.resolve_key(active_key.key_id()).await.expect("warm cache must serve");
    assert_eq!(store.resolve_count(), 1);

    scenario.teardown();
}

#[tokio::test]
async fn test_authentication_survives_total_cache_outage() {
    let scenario = FailScenario::setup();
    fail::cfg("key-cache-before-get", "return").expect("cfg failpoint");
    fail::cfg("key-cache-before-insert", "return").expect("cfg failpoint");

    let keys = Arc::new(MemorySigningKeyStore::new());
    let revocations = Arc::new(MemoryRevocationStore::new());
    let users = Arc::new(MemoryUserStore::new());
    users.create(&make_user(1)).await.expect("create user");

    let active_key = testutil::register_test_key(keys.as_ref()).await;
    let config = TokenConfig::builder()
        .token_ttl(Duration::from_secs(3600))
        .renew_window(Duration::from_secs(300))
        .build()
        .expect("valid config");
    let operator = AccessTokenOperator::builder()
        .active_key(active_key)
        .resolver(Arc::new(CachingKeyResolver::new(
            Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
            keys,
        )))
        .token_ids(TokenIdGenerator::new(0).expect("worker id"))
        .config(config)
        .revocations(revocations)
        .users(users)
        .build();

    let now = chrono::Utc::now();
    let issued = operator.issue(UserId::from(1), now).await.expect("issue");
    let session = operator.authenticate(&issued.token, now).await.expect("authenticate");
    assert_eq!(session.user.id, UserId::from(1));

    scenario.teardown();
}

#[tokio::test]
async fn test_no_failpoints_configured_is_a_noop() {
    let scenario = FailScenario::setup();

    let store = Arc::new(CountingKeyStore::new());
    let active_key = testutil::register_test_key(store.as_ref()).await;
    let resolver = CachingKeyResolver::new(
        Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
        store.clone(),
    );

    resolver.resolve_key(active_key.key_id()).await.expect("resolution works");
    resolver.resolve_key(active_key.key_id()).await.expect("resolution works");
    assert_eq!(store.resolve_count(), 1, "unconfigured failpoints must not disturb caching");

    scenario.teardown();
}
