//! Shared persistence abstraction for Tessera services.
//!
//! This crate defines the store traits behind the token and access-control
//! core: signing keys, the revocation blacklist, users, roles, permissions,
//! tags, and the membership edges between them. It also owns the keyset
//! pagination primitive every listing rides on. Each trait ships with an
//! in-memory reference implementation that honors the same contracts a
//! relational backend must honor, which is what the business crates test
//! against.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                           │
//! │        (RPC handlers for auth, accounts, listings)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │               tessera-authn │ tessera-authz                 │
//! │   (token codec, revocation ledger, permission resolver)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      tessera-storage                        │
//! │   SigningKeyStore │ RevocationStore │ UserStore │ ...       │
//! │              + keyset pagination primitive                  │
//! ├────────────────┬────────────────────────────────────────────┤
//! │ Memory* stores │          relational backend                │
//! │   (testing)    │           (production)                     │
//! └────────────────┴────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use tessera_storage::{
//!     MemoryUserStore, PageRequest, UserOrder, UserRecord, UserStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryUserStore::new();
//!
//!     let user = UserRecord::builder()
//!         .id(1)
//!         .username("ada")
//!         .display_name("Ada Lovelace")
//!         .build();
//!     store.create(&user).await?;
//!
//!     let page = store
//!         .list(PageRequest::new(0, 25), UserOrder::UsernameAscending, None)
//!         .await?;
//!     assert_eq!(page.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Contracts
//!
//! Two contracts run through everything here and are what the business
//! crates lean on:
//!
//! - **Atomic check-then-insert**: duplicate revocations and duplicate
//!   membership pairs are rejected with
//!   [`StorageError::AlreadyExists`], never silently absorbed, even under
//!   concurrent writers.
//! - **Total listing order**: every sort order tie-breaks on the primary
//!   key in the same direction, so consecutive pages never skip or repeat
//!   a row.
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Backends map their internal
//! errors to [`StorageError`] variants; business layers translate those
//! into domain errors and never surface driver shapes.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers
//!   (entity factories, assertion macros). Enable this in
//!   `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod error;
pub mod pagination;
pub mod permission;
pub mod revocation;
pub mod role;
pub mod role_permission;
pub mod signing_key;
pub mod tag;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;
pub mod user;
pub mod user_role;
pub mod user_tag;

// Re-export primary types at crate root for convenience
pub use error::{BoxError, StorageError, StorageResult};
pub use pagination::{Cursor, PageRequest, RowFilter, SortDirection};
pub use permission::{MemoryPermissionStore, PermissionRecord, PermissionStore};
pub use revocation::{MemoryRevocationStore, RevocationStore, RevokedToken};
pub use role::{MemoryRoleStore, RoleOrder, RoleRecord, RoleStore};
pub use role_permission::{MemoryRolePermissionStore, RolePermissionStore};
pub use signing_key::{MemorySigningKeyStore, SigningKeyRecord, SigningKeyStore};
pub use tag::{MemoryTagStore, TagOrder, TagRecord, TagStore};
pub use types::{KeyId, PermissionId, RoleId, TagId, TokenId, UserId};
pub use user::{MemoryUserStore, UserOrder, UserRecord, UserStore};
pub use user_role::{MemoryUserRoleStore, UserRoleStore};
pub use user_tag::{MemoryUserTagStore, UserTagStore};
pub use zeroize::Zeroizing;
