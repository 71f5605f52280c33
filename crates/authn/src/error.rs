//! Authentication error types.
//!
//! This module defines errors that can occur during access-token issuance,
//! verification, and revocation.

use tessera_storage::{StorageError, TokenId, UserId};
use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`: new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Malformed token - cannot be decoded.
    #[error("Invalid token format: {message}")]
    InvalidTokenFormat {
        /// What made the token undecodable.
        message: String,
    },

    /// Algorithm not in the accepted list.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Which algorithm was presented and why it was rejected.
        message: String,
    },

    /// Token header carries no key identifier.
    #[error("Token header missing key ID")]
    MissingKeyId,

    /// Signing key not found in the key store.
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID that could not be resolved.
        kid: String,
    },

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is on the revocation blacklist.
    #[error("Token revoked: {token_id}")]
    TokenRevoked {
        /// Token ID found on the blacklist.
        token_id: TokenId,
    },

    /// Revocation was requested for a token that is already blacklisted.
    ///
    /// Distinct from [`TokenRevoked`](Self::TokenRevoked) so revoking
    /// callers can tell a repeated logout from a rejected credential, but
    /// it classifies as unauthenticated all the same: a second revocation
    /// is refused, never silently absorbed.
    #[error("Token already revoked: {token_id}")]
    AlreadyRevoked {
        /// Token ID that was already blacklisted.
        token_id: TokenId,
    },

    /// Token verified but its subject no longer exists.
    #[error("Token subject not found: {user_id}")]
    SubjectNotFound {
        /// Subject user ID carried by the token.
        user_id: UserId,
    },

    /// Key material could not be parsed or generated.
    #[error("Invalid key material: {message}")]
    InvalidKeyMaterial {
        /// What was wrong with the key material.
        message: String,
    },

    /// Invalid token configuration.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Which configuration constraint was violated.
        message: String,
    },

    /// Storage backend error during a token operation.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
}

impl AuthError {
    /// Creates an [`AuthError::InvalidTokenFormat`] error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat { message: message.into() }
    }

    /// Creates an [`AuthError::UnsupportedAlgorithm`] error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates an [`AuthError::MissingKeyId`] error.
    #[must_use]
    pub fn missing_key_id() -> Self {
        Self::MissingKeyId
    }

    /// Creates an [`AuthError::KeyNotFound`] error.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates an [`AuthError::InvalidSignature`] error.
    #[must_use]
    pub fn invalid_signature() -> Self {
        Self::InvalidSignature
    }

    /// Creates an [`AuthError::TokenExpired`] error.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Creates an [`AuthError::TokenRevoked`] error.
    #[must_use]
    pub fn token_revoked(token_id: TokenId) -> Self {
        Self::TokenRevoked { token_id }
    }

    /// Creates an [`AuthError::AlreadyRevoked`] error.
    #[must_use]
    pub fn already_revoked(token_id: TokenId) -> Self {
        Self::AlreadyRevoked { token_id }
    }

    /// Creates an [`AuthError::SubjectNotFound`] error.
    #[must_use]
    pub fn subject_not_found(user_id: UserId) -> Self {
        Self::SubjectNotFound { user_id }
    }

    /// Creates an [`AuthError::InvalidKeyMaterial`] error.
    #[must_use]
    pub fn invalid_key_material(message: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial { message: message.into() }
    }

    /// Creates an [`AuthError::Config`] error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Creates an [`AuthError::Storage`] error.
    #[must_use]
    pub fn storage(source: StorageError) -> Self {
        Self::Storage { source }
    }

    /// Returns `true` if this error means the presented credential must be
    /// refused (malformed, forged, expired, revoked, or for an unknown
    /// subject or key).
    ///
    /// Callers mapping errors onto a transport layer should translate these
    /// into their "unauthenticated" status and everything else into a
    /// conflict or internal status as appropriate.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenFormat { .. }
                | Self::UnsupportedAlgorithm { .. }
                | Self::MissingKeyId
                | Self::KeyNotFound { .. }
                | Self::InvalidSignature
                | Self::TokenExpired
                | Self::TokenRevoked { .. }
                | Self::AlreadyRevoked { .. }
                | Self::SubjectNotFound { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => AuthError::invalid_token_format("Invalid JWT structure"),
            ErrorKind::InvalidSignature => AuthError::invalid_signature(),
            ErrorKind::ExpiredSignature => AuthError::token_expired(),
            ErrorKind::InvalidAlgorithm => {
                AuthError::unsupported_algorithm("Algorithm does not match the resolved key")
            },
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::invalid_token_format(format!("Missing required claim: {claim}"))
            },
            ErrorKind::InvalidRsaKey(detail) => {
                AuthError::invalid_key_material(format!("Invalid RSA key: {detail}"))
            },
            ErrorKind::InvalidKeyFormat => AuthError::invalid_key_material("Invalid key format"),
            ErrorKind::RsaFailedSigning => AuthError::invalid_key_material("RSA signing failed"),
            _ => AuthError::invalid_token_format(format!("JWT error: {err}")),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage { source: err }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_token_format("test");
        assert_eq!(err.to_string(), "Invalid token format: test");

        let err = AuthError::token_expired();
        assert_eq!(err.to_string(), "Token expired");

        let err = AuthError::key_not_found("41");
        assert_eq!(err.to_string(), "Signing key not found: 41");

        let err = AuthError::token_revoked(TokenId::from(9001));
        assert_eq!(err.to_string(), "Token revoked: 9001");

        let err = AuthError::subject_not_found(UserId::from(7));
        assert_eq!(err.to_string(), "Token subject not found: 7");
    }

    #[test]
    fn test_error_from_jsonwebtoken() {
        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        let auth_err: AuthError = jwt_err.into();
        assert!(matches!(auth_err, AuthError::TokenExpired));

        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        let auth_err: AuthError = jwt_err.into();
        assert!(matches!(auth_err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_error_from_jsonwebtoken_missing_claim() {
        let jwt_err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim("exp".into()),
        );
        let auth_err: AuthError = jwt_err.into();
        assert!(
            matches!(&auth_err, AuthError::InvalidTokenFormat { message } if message.contains("exp"))
        );
    }

    #[test]
    fn test_storage_error_from_conversion() {
        let storage_err = StorageError::Timeout;
        let auth_err: AuthError = storage_err.into();
        assert!(matches!(auth_err, AuthError::Storage { .. }));
        assert_eq!(auth_err.to_string(), "Storage error: Operation timeout");
    }

    #[test]
    fn test_storage_error_preserves_source_chain() {
        use std::error::Error;

        let storage_err =
            StorageError::Connection { message: "connection refused".into(), source: None };
        let auth_err = AuthError::storage(storage_err);

        let source = auth_err.source();
        assert!(source.is_some(), "source chain must be preserved");

        let source = source.expect("source exists");
        assert_eq!(source.to_string(), "Connection error: connection refused");
    }

    #[test]
    fn test_unauthenticated_classification() {
        assert!(AuthError::invalid_token_format("x").is_unauthenticated());
        assert!(AuthError::unsupported_algorithm("x").is_unauthenticated());
        assert!(AuthError::missing_key_id().is_unauthenticated());
        assert!(AuthError::key_not_found("1").is_unauthenticated());
        assert!(AuthError::invalid_signature().is_unauthenticated());
        assert!(AuthError::token_expired().is_unauthenticated());
        assert!(AuthError::token_revoked(TokenId::from(1)).is_unauthenticated());
        assert!(AuthError::already_revoked(TokenId::from(1)).is_unauthenticated());
        assert!(AuthError::subject_not_found(UserId::from(1)).is_unauthenticated());

        assert!(!AuthError::invalid_key_material("x").is_unauthenticated());
        assert!(!AuthError::config("x").is_unauthenticated());
        assert!(!AuthError::storage(StorageError::Timeout).is_unauthenticated());
    }

    #[test]
    fn test_revoked_variants_are_distinct() {
        // Both refuse the caller, but the variants stay separate so a
        // blacklisted presentation and a repeated logout read differently.
        let verify_err = AuthError::token_revoked(TokenId::from(5));
        let revoke_err = AuthError::already_revoked(TokenId::from(5));
        assert!(matches!(verify_err, AuthError::TokenRevoked { .. }));
        assert!(matches!(revoke_err, AuthError::AlreadyRevoked { .. }));
        assert!(verify_err.is_unauthenticated());
        assert!(revoke_err.is_unauthenticated());
    }
}
