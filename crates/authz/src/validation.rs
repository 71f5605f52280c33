//! Permission name validation.
//!
//! Permission names are dotted paths such as `articles.read` or
//! `billing.invoices.export`. Each segment is one or more characters drawn
//! from `[a-z0-9_]`, segments are joined by single dots, and the whole name
//! is at most [`MAX_PERMISSION_NAME_LEN`] bytes. Names are rejected here,
//! before any store is touched, so a backend never sees a malformed name.

use crate::error::{AuthzError, Result};

/// Maximum length of a permission name in bytes.
pub const MAX_PERMISSION_NAME_LEN: usize = 256;

/// Validate a permission name against the dotted-path grammar.
///
/// # Errors
///
/// Returns [`AuthzError::InvalidArgument`] if the name:
/// - Is empty or longer than [`MAX_PERMISSION_NAME_LEN`] bytes
/// - Starts or ends with a dot, or contains consecutive dots
/// - Contains any character outside `[a-z0-9_.]`
///
/// # Examples
///
/// ```
/// use tessera_authz::validate_permission_name;
///
/// assert!(validate_permission_name("articles.read").is_ok());
/// assert!(validate_permission_name("Articles.Read").is_err());
/// assert!(validate_permission_name("articles..read").is_err());
/// ```
pub fn validate_permission_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuthzError::invalid_argument("permission name must not be empty"));
    }

    if name.len() > MAX_PERMISSION_NAME_LEN {
        return Err(AuthzError::invalid_argument(format!(
            "permission name exceeds {MAX_PERMISSION_NAME_LEN} bytes: {} bytes",
            name.len()
        )));
    }

    for segment in name.split('.') {
        if segment.is_empty() {
            return Err(AuthzError::invalid_argument(format!(
                "permission name '{name}' contains an empty dotted segment"
            )));
        }

        for ch in segment.chars() {
            if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_') {
                return Err(AuthzError::invalid_argument(format!(
                    "permission name '{name}' contains invalid character '{ch}'"
                )));
            }
        }
    }

    Ok(())
}
