//! Shared test utilities for store testing.
//!
//! This module provides factories for test entities and assertion macros
//! over [`StorageResult`] values. It is feature-gated behind `testutil` to
//! prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tessera-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use tessera_storage::testutil::{make_user, populated_user_store};
//! ```

use crate::{
    error::{StorageError, StorageResult},
    permission::PermissionRecord,
    role::RoleRecord,
    tag::TagRecord,
    user::{MemoryUserStore, UserRecord, UserStore},
};

/// Create a deterministic test user.
///
/// Usernames are zero-padded (`user0042`) so lexicographic ordering matches
/// numeric ordering, which keeps listing assertions readable.
#[must_use]
pub fn make_user(id: i64) -> UserRecord {
    UserRecord::builder()
        .id(id)
        .username(format!("user{id:04}"))
        .display_name(format!("User {id:04}"))
        .build()
}

/// Create a deterministic test role.
#[must_use]
pub fn make_role(id: i64) -> RoleRecord {
    RoleRecord::builder().id(id).display_name(format!("Role {id:04}")).build()
}

/// Create a deterministic test tag.
#[must_use]
pub fn make_tag(id: i64) -> TagRecord {
    TagRecord::builder().id(id).display_name(format!("Tag {id:04}")).build()
}

/// Create a test permission with the given dotted name.
#[must_use]
pub fn make_permission(id: i64, name: &str) -> PermissionRecord {
    PermissionRecord::builder().id(id).name(name).build()
}

/// Create a [`MemoryUserStore`] pre-populated with users `1..=count`.
///
/// # Panics
///
/// Panics if any `create` operation fails (should not happen with
/// `MemoryUserStore` and distinct IDs).
pub async fn populated_user_store(count: i64) -> MemoryUserStore {
    let store = MemoryUserStore::new();
    for id in 1..=count {
        store.create(&make_user(id)).await.expect("populate create failed");
    }
    store
}

/// Assert that a [`StorageResult`] is a [`StorageError::AlreadyExists`].
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use tessera_storage::assert_already_exists;
/// use tessera_storage::error::{StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::already_exists("user/1"));
/// assert_already_exists!(result);
/// ```
#[macro_export]
macro_rules! assert_already_exists {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::AlreadyExists { .. })),
            "expected StorageError::AlreadyExists, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::AlreadyExists { .. })),
            "{}: expected StorageError::AlreadyExists, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use tessera_storage::assert_not_found;
/// use tessera_storage::error::{StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::not_found("missing"));
/// assert_not_found!(result);
/// ```
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "{}: expected StorageError::NotFound, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Helper to verify that a result is an `AlreadyExists` error.
///
/// This is a convenience for tests that need to match on error variants
/// without importing the error type directly.
pub fn is_already_exists<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::AlreadyExists { .. }))
}

/// Helper to verify that a result is a `NotFound` error.
pub fn is_not_found<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::NotFound { .. }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_make_user_ordering_matches_ids() {
        let u1 = make_user(1);
        let u10 = make_user(10);
        let u100 = make_user(100);
        assert!(u1.username < u10.username);
        assert!(u10.username < u100.username);
    }

    #[tokio::test]
    async fn test_populated_user_store() {
        let store = populated_user_store(5).await;
        for id in 1..=5 {
            let user = store.get(crate::UserId::from(id)).await.expect("get");
            assert!(user.is_some(), "user {id} should exist");
        }
        assert_eq!(store.count(None).await.expect("count"), 5);
    }

    #[test]
    fn test_assert_already_exists_macro() {
        let result: StorageResult<()> = Err(StorageError::already_exists("user/1"));
        assert_already_exists!(result);
    }

    #[test]
    fn test_assert_not_found_macro() {
        let result: StorageResult<()> = Err(StorageError::not_found("missing"));
        assert_not_found!(result);
    }

    #[test]
    fn test_assert_storage_ok_macro() {
        let result: StorageResult<i32> = Ok(42);
        let val = assert_storage_ok!(result);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_is_predicates() {
        assert!(is_already_exists::<()>(&Err(StorageError::already_exists("k"))));
        assert!(!is_already_exists::<()>(&Ok(())));
        assert!(is_not_found::<()>(&Err(StorageError::not_found("k"))));
        assert!(!is_not_found::<()>(&Ok(())));
    }
}
