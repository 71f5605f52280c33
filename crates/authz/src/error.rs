//! Error types for access-control operations.

use tessera_storage::{PermissionId, RoleId, StorageError, UserId};
use thiserror::Error;

/// Errors returned by access-control operations.
///
/// Every failure is one of five kinds: bad input caught before persistence
/// (`InvalidArgument`), a missing referenced entity (`NotFound`), a
/// duplicate entity or association (`AlreadyExists`), removal of an
/// association that is not there (`FailedPrecondition`), or an unexpected
/// backend fault (`Storage`). Association races lose with `AlreadyExists`,
/// never with a raw constraint error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// Input rejected before any store was touched.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the input.
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"User"` or `"Role"`.
        entity: &'static str,
        /// The missing entity's ID.
        id: i64,
    },

    /// The entity or association already exists.
    #[error("Already exists: {message}")]
    AlreadyExists {
        /// What already exists.
        message: String,
    },

    /// The association to remove does not exist.
    #[error("Failed precondition: {message}")]
    FailedPrecondition {
        /// Which precondition failed.
        message: String,
    },

    /// Storage backend error during an access-control operation.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for diagnostics.
    #[error("Storage error: {source}")]
    Storage {
        /// The underlying storage failure.
        #[source]
        source: StorageError,
    },
}

impl AuthzError {
    /// Creates an [`AuthzError::InvalidArgument`] error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Creates an [`AuthzError::NotFound`] error for a user.
    #[must_use]
    pub fn user_not_found(user_id: UserId) -> Self {
        Self::NotFound { entity: "User", id: user_id.into() }
    }

    /// Creates an [`AuthzError::NotFound`] error for a role.
    #[must_use]
    pub fn role_not_found(role_id: RoleId) -> Self {
        Self::NotFound { entity: "Role", id: role_id.into() }
    }

    /// Creates an [`AuthzError::NotFound`] error for a permission.
    #[must_use]
    pub fn permission_not_found(permission_id: PermissionId) -> Self {
        Self::NotFound { entity: "Permission", id: permission_id.into() }
    }

    /// Creates an [`AuthzError::AlreadyExists`] error.
    #[must_use]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists { message: message.into() }
    }

    /// Creates an [`AuthzError::FailedPrecondition`] error.
    #[must_use]
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition { message: message.into() }
    }

    /// Creates an [`AuthzError::Storage`] error.
    #[must_use]
    pub fn storage(source: StorageError) -> Self {
        Self::Storage { source }
    }
}

impl From<StorageError> for AuthzError {
    fn from(err: StorageError) -> Self {
        AuthzError::Storage { source: err }
    }
}

/// Convenience alias for access-control results.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AuthzError::invalid_argument("bad name").to_string(),
            "Invalid argument: bad name"
        );
        assert_eq!(AuthzError::user_not_found(UserId::from(7)).to_string(), "User not found: 7");
        assert_eq!(AuthzError::role_not_found(RoleId::from(3)).to_string(), "Role not found: 3");
        assert_eq!(
            AuthzError::permission_not_found(PermissionId::from(9)).to_string(),
            "Permission not found: 9"
        );
    }

    #[test]
    fn test_storage_conversion_preserves_source() {
        let err: AuthzError = StorageError::timeout().into();
        assert!(matches!(err, AuthzError::Storage { .. }));
        assert!(err.source().is_some(), "source chain must be preserved");
    }
}
