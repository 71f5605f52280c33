//! Token issuance, verification, and revocation for Tessera services.
//!
//! This crate owns the access-token lifecycle: RS512-signed JWTs minted
//! against a registered signing key, verified against whichever key their
//! `kid` header names, renewed as they approach expiry, and killed early
//! through a revocation blacklist. Signing keys live in
//! [`tessera_storage::SigningKeyStore`]; rotation is registering a new key
//! and signing with it, while verification keeps honoring tokens signed
//! by every key still on record.
//!
//! # Architecture
//!
//! ```text
//!           issue(user, now)                authenticate(token, now)
//!                 │                                   │
//!                 ▼                                   ▼
//!        ┌─────────────────┐              ┌──────────────────────┐
//!        │ AccessToken     │              │ TokenCodec::decode   │
//!        │ Operator        │              │  header → alg check  │
//!        │  subject check  │              │  kid → KeyResolver   │
//!        │  audit log      │              │  signature → expiry  │
//!        └────────┬────────┘              └──────────┬───────────┘
//!                 │                                  │
//!                 ▼                                  ▼
//!        ┌─────────────────┐              ┌──────────────────────┐
//!        │ TokenCodec      │              │ revocation blacklist │
//!        │  ::generate     │              │ subject lookup       │
//!        │  (ActiveKey)    │              │ sliding renewal      │
//!        └─────────────────┘              └──────────────────────┘
//! ```
//!
//! Verification never reads the wall clock: every operation takes `now`
//! as an argument, which keeps behavior deterministic under test and
//! leaves clock policy to the caller.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use tessera_authn::{
//!     AccessTokenOperator, CachingKeyResolver, MokaKeyCache, TokenConfig,
//!     TokenIdGenerator, provision_active_key,
//! };
//! use tessera_storage::{
//!     MemoryRevocationStore, MemorySigningKeyStore, MemoryUserStore, UserId,
//!     UserRecord, UserStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let keys = Arc::new(MemorySigningKeyStore::new());
//!     let revocations = Arc::new(MemoryRevocationStore::new());
//!     let users = Arc::new(MemoryUserStore::new());
//!
//!     let user = UserRecord::builder()
//!         .id(1)
//!         .username("ada")
//!         .display_name("Ada Lovelace")
//!         .build();
//!     users.create(&user).await?;
//!
//!     let (active_key, _pair) = provision_active_key(keys.as_ref()).await?;
//!     let resolver = CachingKeyResolver::new(
//!         Arc::new(MokaKeyCache::new(Duration::from_secs(300))),
//!         keys,
//!     );
//!
//!     let config = TokenConfig::builder()
//!         .renew_window(Duration::from_secs(24 * 60 * 60))
//!         .build()?;
//!     let operator = AccessTokenOperator::builder()
//!         .active_key(active_key)
//!         .resolver(Arc::new(resolver))
//!         .token_ids(TokenIdGenerator::new(0)?)
//!         .config(config)
//!         .revocations(revocations)
//!         .users(users.clone())
//!         .build();
//!
//!     let now = chrono::Utc::now();
//!     let issued = operator.issue(UserId::from(1), now).await?;
//!     let session = operator.authenticate(&issued.token, now).await?;
//!     assert_eq!(session.user.id, UserId::from(1));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Security Posture
//!
//! - Only RS512 is accepted. `none` and every HMAC algorithm are rejected
//!   before any key material is touched, per RFC 8725 guidance.
//! - Expiry is exact: a token is dead at its `exp` instant, with no
//!   leeway.
//! - Revocation is exactly-once. Re-revoking a token is refused with
//!   [`AuthError::AlreadyRevoked`], which gives callers a reliable signal
//!   for replayed logout requests.
//! - Private key material is held in [`Zeroizing`](tessera_storage::Zeroizing)
//!   buffers and kept out of `Debug` output.
//!
//! # Error Handling
//!
//! All operations return [`Result`] with [`AuthError`].
//! [`AuthError::is_unauthenticated`] separates credential rejections,
//! which callers surface as a generic authentication failure, from
//! operational faults like [`AuthError::Storage`], which they surface as
//! internal errors.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with key fixtures and
//!   token-crafting helpers. Enable this in `[dev-dependencies]` for
//!   integration tests.
//! - **`failpoints`**: Compiles in [`fail`] failpoints for fault-injection
//!   testing. Never enable in production builds.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod config;
pub mod error;
pub mod jwt;
pub mod key_cache;
pub mod keys;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod token_id;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use access::{AccessTokenOperator, AuthSession};
pub use config::{DEFAULT_TOKEN_TTL, TokenConfig};
pub use error::{AuthError, Result};
pub use jwt::{
    DecodedToken, IssuedToken, KeyResolver, StoreKeyResolver, TokenClaims, TokenCodec,
};
pub use key_cache::{
    CachingKeyResolver, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, KeyCache, MokaKeyCache,
};
pub use keys::{
    ActiveKey, GeneratedKeyPair, RSA_KEY_BITS, generate_rsa_keypair, provision_active_key,
};
pub use token_id::{MAX_WORKER_ID, TokenIdGenerator};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
