//! Storage error types and result alias.
//!
//! Every store trait in this crate returns these error types. Backends map
//! their internal failures onto this taxonomy at the data-access boundary;
//! the business layers above translate them into domain errors and never see
//! driver-specific error shapes.
//!
//! # Error Types
//!
//! - [`StorageError::NotFound`] - Referenced row does not exist
//! - [`StorageError::AlreadyExists`] - Unique constraint rejected an insert
//! - [`StorageError::Conflict`] - Concurrent modification lost the race
//! - [`StorageError::Connection`] - Network or connection-related failures
//! - [`StorageError::Serialization`] - Data encoding/decoding failures
//! - [`StorageError::Internal`] - Backend-specific internal errors
//! - [`StorageError::Timeout`] - Operation exceeded time limit
//!
//! `AlreadyExists` is deliberately distinct from `Internal`: duplicate
//! revocations and duplicate RBAC associations must surface as domain
//! errors, so the constraint rejection has to be recognizable upstream.
//!
//! # Example
//!
//! ```
//! use tessera_storage::{StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::not_found(key))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`: new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The referenced row was not found.
    #[error("not found: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// A uniqueness constraint rejected an insert.
    ///
    /// Raised when a row with the same primary key or unique column already
    /// exists. Check-then-insert callers rely on this as the correctness
    /// backstop when two writers race past the existence check.
    #[error("already exists: {key}")]
    AlreadyExists {
        /// The key or unique value that already exists.
        key: String,
    },

    /// A concurrent modification won the race.
    ///
    /// Distinct from [`StorageError::AlreadyExists`]: `Conflict` covers
    /// lost-update races on existing rows, not duplicate inserts.
    #[error("conflict")]
    Conflict,

    /// Connection or network error.
    ///
    /// A failure to communicate with the storage backend, such as a network
    /// timeout, DNS failure, or connection refused.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization error.
    ///
    /// Data could not be encoded for storage or decoded when retrieved.
    /// Typically indicates corruption or schema incompatibility.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    ///
    /// Catch-all for backend-specific errors that fit no other category.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `AlreadyExists` error for the given key.
    #[must_use]
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict() -> Self {
        Self::Conflict
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Whether this error is transient and likely to succeed on retry.
    ///
    /// Advisory callers (the key cache) treat transient failures as misses
    /// rather than propagating them.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}
