//! Token issuance configuration.
//!
//! This module provides [`TokenConfig`], which controls access-token lifetime
//! and the sliding-renewal window applied during authentication.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Default access-token lifetime (7 days).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for token issuance and renewal.
///
/// The renewal window has no default: how aggressively tokens are refreshed
/// is a deployment decision, and a silently-inherited value has caused
/// surprise token churn before. Callers must choose it explicitly.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tessera_authn::TokenConfig;
///
/// let config = TokenConfig::builder()
///     .token_ttl(Duration::from_secs(3600))
///     .renew_window(Duration::from_secs(600))
///     .build()?;
/// # Ok::<(), tessera_authn::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Lifetime of newly issued tokens.
    #[serde(with = "humantime_serde", default = "default_token_ttl")]
    pub(crate) token_ttl: Duration,

    /// Window before expiry within which authentication mints a renewal.
    #[serde(with = "humantime_serde")]
    pub(crate) renew_window: Duration,
}

fn default_token_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

#[bon::bon]
impl TokenConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Arguments
    ///
    /// * `renew_window` - Window before expiry within which authentication mints a renewal token.
    ///   Required; must be non-zero and shorter than `token_ttl`.
    ///
    /// # Optional Fields
    ///
    /// * `token_ttl` - Lifetime of newly issued tokens (default: 7 days).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `token_ttl` is zero
    /// - `renew_window` is zero
    /// - `renew_window` is not shorter than `token_ttl`
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_TOKEN_TTL)] token_ttl: Duration,
        renew_window: Duration,
    ) -> Result<Self> {
        if token_ttl.is_zero() {
            return Err(AuthError::config("token_ttl must be non-zero"));
        }

        if renew_window.is_zero() {
            return Err(AuthError::config("renew_window must be non-zero"));
        }

        if renew_window >= token_ttl {
            return Err(AuthError::config("renew_window must be shorter than token_ttl"));
        }

        Ok(Self { token_ttl, renew_window })
    }

    /// Returns the lifetime of newly issued tokens.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Returns the sliding-renewal window.
    #[must_use]
    pub fn renew_window(&self) -> Duration {
        self.renew_window
    }
}
