//! JWT algorithm validation.
//!
//! This module provides security checks for JWT algorithms, ensuring only
//! the approved asymmetric algorithm is accepted.
//!
//! # Security
//!
//! These validators implement security best practices:
//! - Strict algorithm checks to prevent algorithm substitution attacks
//! - Only the asymmetric RS512 algorithm is allowed
//! - Symmetric algorithms and "none" are always rejected

use crate::error::AuthError;

/// Forbidden JWT algorithms that are never accepted for security reasons.
///
/// These algorithms are blocked because:
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms.
///
/// Tokens are minted with RS512 and nothing else, so the verifier accepts
/// RS512 and nothing else. RFC 8725 Section 3.1 requires validators to
/// reject algorithms they do not fully implement.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS512"];

/// Validate a JWT algorithm against security policies.
///
/// This function enforces strict algorithm security per RFC 8725:
/// - ALWAYS rejects symmetric algorithms (HS256, HS384, HS512)
/// - ALWAYS rejects "none"
/// - Only accepts RS512
///
/// # Arguments
///
/// * `alg` - The algorithm from the JWT header
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if:
/// - Algorithm is symmetric (HS256, HS384, HS512)
/// - Algorithm is "none"
/// - Algorithm is not in [`ACCEPTED_ALGORITHMS`]
///
/// # Examples
///
/// ```
/// use tessera_authn::validation::validate_algorithm;
///
/// // RS512 is accepted
/// assert!(validate_algorithm("RS512").is_ok());
///
/// // Other asymmetric algorithms are not supported
/// assert!(validate_algorithm("EdDSA").is_err());
///
/// // Symmetric algorithm rejected
/// assert!(validate_algorithm("HS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list (only RS512 is supported)"
        )));
    }

    Ok(())
}
