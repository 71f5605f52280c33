//! Access-token lifecycle: issue, authenticate, renew, revoke, sweep.
//!
//! [`AccessTokenOperator`] ties the codec to the revocation and user
//! stores. Every operation takes `now` as an argument instead of reading
//! the wall clock, so callers control time and tests are deterministic.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tessera_storage::{
    RevocationStore, RevokedToken, StorageError, UserId, UserRecord, UserStore,
};

use crate::{
    config::TokenConfig,
    error::{AuthError, Result},
    jwt::{DecodedToken, IssuedToken, KeyResolver, TokenCodec},
    keys::ActiveKey,
    token_id::TokenIdGenerator,
};

/// True once `now` is within `renew_window` of `expire_at`.
pub(crate) fn renewal_due(
    expire_at: DateTime<Utc>,
    now: DateTime<Utc>,
    renew_window: Duration,
) -> bool {
    match chrono::Duration::from_std(renew_window) {
        Ok(window) => {
            now.checked_add_signed(window).is_none_or(|threshold| threshold >= expire_at)
        }
        // A window too large for the timestamp range covers any expiry.
        Err(_) => true,
    }
}

/// Result of a successful [`AccessTokenOperator::authenticate`] call.
#[derive(Clone, Debug)]
pub struct AuthSession {
    /// The authenticated user.
    pub user: UserRecord,
    /// Claims of the presented token.
    pub token: DecodedToken,
    /// Replacement token, minted when the presented one was close to
    /// expiry. The presented token stays valid until its own expiry.
    pub renewed: Option<IssuedToken>,
}

/// Issues, authenticates, and revokes access tokens.
pub struct AccessTokenOperator {
    codec: TokenCodec,
    revocations: Arc<dyn RevocationStore>,
    users: Arc<dyn UserStore>,
    renew_window: Duration,
}

#[bon::bon]
impl AccessTokenOperator {
    /// Assembles an operator from its parts.
    ///
    /// The token lifetime and renewal window both come from `config`, so
    /// the codec and the renewal check cannot drift apart.
    #[builder]
    pub fn new(
        active_key: ActiveKey,
        resolver: Arc<dyn KeyResolver>,
        token_ids: TokenIdGenerator,
        config: TokenConfig,
        revocations: Arc<dyn RevocationStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let codec = TokenCodec::builder()
            .active_key(active_key)
            .resolver(resolver)
            .token_ids(token_ids)
            .token_ttl(config.token_ttl())
            .build();
        Self { codec, revocations, users, renew_window: config.renew_window() }
    }
}

impl AccessTokenOperator {
    /// The underlying token codec.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mints a token for an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SubjectNotFound`] if `user_id` does not exist,
    /// plus any codec failure from signing.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken> {
        if self.users.get(user_id).await?.is_none() {
            return Err(AuthError::subject_not_found(user_id));
        }

        let issued = self.codec.generate(user_id, now)?;
        tracing::info!(
            audit.action = "issue_token",
            audit.resource = %format_args!("token/{}", issued.token_id),
            audit.result = "success",
            "audit_event"
        );
        Ok(issued)
    }

    /// Authenticates a presented token.
    ///
    /// Checks run in order: signature and expiry via the codec, then the
    /// revocation blacklist, then the subject lookup. When the token is
    /// inside the renewal window a replacement is minted and returned in
    /// [`AuthSession::renewed`].
    ///
    /// # Errors
    ///
    /// Any codec rejection, [`AuthError::TokenRevoked`] for blacklisted
    /// tokens, and [`AuthError::SubjectNotFound`] if the subject no longer
    /// exists.
    #[tracing::instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<AuthSession> {
        let decoded = self.codec.decode(token, now).await?;

        if self.revocations.contains(decoded.token_id).await? {
            return Err(AuthError::token_revoked(decoded.token_id));
        }

        let user = self
            .users
            .get(decoded.user_id)
            .await?
            .ok_or_else(|| AuthError::subject_not_found(decoded.user_id))?;

        let renewed = if renewal_due(decoded.expire_at, now, self.renew_window) {
            Some(self.codec.generate(decoded.user_id, now)?)
        } else {
            None
        };

        Ok(AuthSession { user, token: decoded, renewed })
    }

    /// Revokes a live token by adding it to the blacklist.
    ///
    /// The token must still verify: an expired token is rejected with
    /// [`AuthError::TokenExpired`] rather than blacklisted, since expiry
    /// already makes it unusable. Revoking the same token twice is refused
    /// every time, even from concurrent callers: the race loser sees the
    /// same rejection as a late duplicate.
    ///
    /// # Errors
    ///
    /// Any codec rejection, or [`AuthError::AlreadyRevoked`] if the token
    /// is on the blacklist.
    #[tracing::instrument(skip(self, token))]
    pub async fn revoke(&self, token: &str, now: DateTime<Utc>) -> Result<DecodedToken> {
        let decoded = self.codec.decode(token, now).await?;

        let entry = RevokedToken::new(decoded.token_id, decoded.expire_at);
        match self.revocations.insert_if_absent(entry).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthError::already_revoked(decoded.token_id));
            }
            Err(other) => return Err(AuthError::storage(other)),
        }

        tracing::info!(
            audit.action = "revoke_token",
            audit.resource = %format_args!("token/{}", decoded.token_id),
            audit.result = "success",
            "audit_event"
        );
        Ok(decoded)
    }

    /// Deletes blacklist entries whose tokens expired at or before `now`.
    ///
    /// Returns the number of entries removed. Expired entries are inert
    /// either way, since expiry is checked before the blacklist; sweeping
    /// only reclaims space.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the delete fails.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let deleted = self.revocations.delete_expired(now).await?;
        if deleted > 0 {
            tracing::info!(deleted, "swept expired revocation entries");
        }
        Ok(deleted)
    }
}
