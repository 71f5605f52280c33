//! RS512 access-token encoding and verification.
//!
//! # Wire Format
//!
//! Tokens are compact JWS values. The header carries `alg: RS512` and a
//! `kid` naming the signing key as a decimal string. The payload carries
//! three claims:
//!
//! - `jti`: token ID, decimal string
//! - `sub`: subject user ID, decimal string
//! - `exp`: expiry, seconds since the Unix epoch
//!
//! Producers have historically emitted `jti` and `sub` as either strings or
//! bare numbers, so deserialization accepts both forms for every claim.
//!
//! # Verification
//!
//! [`TokenCodec::decode`] never consults the wall clock. Callers pass `now`
//! in, and expiry is checked against exactly that instant. A token is
//! expired once `exp <= now`.

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tessera_storage::{KeyId, SigningKeyStore, TokenId, UserId};

use crate::{
    config::DEFAULT_TOKEN_TTL,
    error::{AuthError, Result},
    keys::ActiveKey,
    token_id::TokenIdGenerator,
    validation::validate_algorithm,
};

/// Claims carried by every access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Token ID (`jti`), serialized as a decimal string.
    #[serde(with = "decimal_string")]
    pub jti: i64,

    /// Subject user ID (`sub`), serialized as a decimal string.
    #[serde(with = "decimal_string")]
    pub sub: i64,

    /// Expiry (`exp`), seconds since the Unix epoch.
    #[serde(with = "epoch_seconds")]
    pub exp: i64,
}

/// Lenient `i64` deserialization shared by the claim field codecs.
///
/// Accepts a JSON integer or a decimal string; rejects floats and
/// non-numeric strings.
struct LenientI64Visitor;

impl serde::de::Visitor<'_> for LenientI64Visitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("an integer or a decimal string")
    }

    fn visit_i64<E>(self, value: i64) -> std::result::Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E>(self, value: u64) -> std::result::Result<i64, E>
    where
        E: serde::de::Error,
    {
        i64::try_from(value).map_err(|_| E::custom("integer out of range for i64"))
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<i64, E>
    where
        E: serde::de::Error,
    {
        value.parse().map_err(|_| E::custom(format!("not a decimal integer: {value:?}")))
    }
}

mod decimal_string {
    use serde::{Deserializer, Serializer};

    use super::LenientI64Visitor;

    pub fn serialize<S: Serializer>(
        value: &i64,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<i64, D::Error> {
        deserializer.deserialize_any(LenientI64Visitor)
    }
}

mod epoch_seconds {
    use serde::{Deserializer, Serializer};

    use super::LenientI64Visitor;

    pub fn serialize<S: Serializer>(
        value: &i64,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<i64, D::Error> {
        deserializer.deserialize_any(LenientI64Visitor)
    }
}

/// A verified, decoded access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedToken {
    /// Token ID from the `jti` claim.
    pub token_id: TokenId,
    /// Subject user ID from the `sub` claim.
    pub user_id: UserId,
    /// Expiry instant from the `exp` claim.
    pub expire_at: DateTime<Utc>,
}

/// A freshly minted access token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    /// Signed compact JWS string.
    pub token: String,
    /// Token ID embedded in the `jti` claim.
    pub token_id: TokenId,
    /// Expiry instant embedded in the `exp` claim.
    pub expire_at: DateTime<Utc>,
}

/// Resolves a key ID to the public key used for signature verification.
///
/// This is the codec's only dependency for verification, which keeps the
/// lookup strategy (direct store access, cached, pre-loaded) out of the
/// token logic itself.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Returns the decoding key registered under `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyNotFound`] if no key is registered under
    /// `key_id`, or [`AuthError::Storage`] if the lookup itself fails.
    async fn resolve_key(&self, key_id: KeyId) -> Result<DecodingKey>;
}

/// [`KeyResolver`] that reads straight from a [`SigningKeyStore`].
pub struct StoreKeyResolver {
    store: Arc<dyn SigningKeyStore>,
}

impl StoreKeyResolver {
    /// Creates a resolver over the given key store.
    #[must_use]
    pub fn new(store: Arc<dyn SigningKeyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl KeyResolver for StoreKeyResolver {
    async fn resolve_key(&self, key_id: KeyId) -> Result<DecodingKey> {
        let record = self
            .store
            .resolve(key_id)
            .await?
            .ok_or_else(|| AuthError::key_not_found(key_id.to_string()))?;
        decoding_key_from_pem(&record.public_key)
    }
}

/// Parses a PEM-encoded RSA public key into a [`DecodingKey`].
pub(crate) fn decoding_key_from_pem(pem: &str) -> Result<DecodingKey> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|err| AuthError::invalid_key_material(format!("public key PEM rejected: {err}")))
}

/// Signs and verifies access tokens.
///
/// The codec holds the issuer's [`ActiveKey`] for signing and a
/// [`KeyResolver`] for verification. The two sides are deliberately
/// asymmetric: verification must keep accepting tokens signed by earlier
/// keys after a rotation, so it resolves keys by the `kid` each token
/// carries instead of assuming the current one.
#[derive(bon::Builder)]
pub struct TokenCodec {
    active_key: ActiveKey,
    resolver: Arc<dyn KeyResolver>,
    token_ids: TokenIdGenerator,
    #[builder(default = DEFAULT_TOKEN_TTL)]
    token_ttl: Duration,
}

impl TokenCodec {
    /// Mints a signed token for `user_id`, expiring `token_ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the configured lifetime cannot be
    /// represented, or [`AuthError::InvalidKeyMaterial`] if signing fails.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub fn generate(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken> {
        let token_id = self.token_ids.next_id(now);

        let ttl = chrono::Duration::from_std(self.token_ttl)
            .map_err(|_| AuthError::config("token_ttl out of range"))?;
        let expire_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::config("token lifetime overflows timestamp range"))?;

        let claims =
            TokenClaims { jti: token_id.into(), sub: user_id.into(), exp: expire_at.timestamp() };

        let mut header = Header::new(Algorithm::RS512);
        header.kid = Some(self.active_key.key_id().to_string());

        let token = jsonwebtoken::encode(&header, &claims, self.active_key.encoding_key())?;
        Ok(IssuedToken { token, token_id, expire_at })
    }

    /// Verifies a token and returns its decoded claims.
    ///
    /// The checks run in order: header shape and algorithm, key resolution
    /// via the `kid` header, signature, then expiry against `now`.
    ///
    /// # Errors
    ///
    /// All rejections are credential failures: [`AuthError::InvalidTokenFormat`],
    /// [`AuthError::UnsupportedAlgorithm`], [`AuthError::MissingKeyId`],
    /// [`AuthError::KeyNotFound`], [`AuthError::InvalidSignature`], or
    /// [`AuthError::TokenExpired`]. Key-store failures surface as
    /// [`AuthError::Storage`].
    #[tracing::instrument(skip(self, token))]
    pub async fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<DecodedToken> {
        let header = jsonwebtoken::decode_header(token)?;
        validate_algorithm(&format!("{:?}", header.alg))?;

        let kid = header.kid.ok_or_else(AuthError::missing_key_id)?;
        let key_id = match kid.parse::<i64>() {
            Ok(raw) => KeyId::from(raw),
            Err(_) => return Err(AuthError::key_not_found(kid)),
        };

        let decoding_key = self.resolver.resolve_key(key_id).await?;
        let claims = verify_signature(token, &decoding_key)?;

        let expire_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::invalid_token_format("exp outside representable range"))?;
        if expire_at <= now {
            return Err(AuthError::token_expired());
        }

        Ok(DecodedToken {
            token_id: TokenId::from(claims.jti),
            user_id: UserId::from(claims.sub),
            expire_at,
        })
    }
}

/// Verifies the RS512 signature and deserializes the claims.
fn verify_signature(token: &str, decoding_key: &DecodingKey) -> Result<TokenClaims> {
    let mut validation = Validation::new(Algorithm::RS512);
    // Expiry is checked by the caller against the supplied clock.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = jsonwebtoken::decode::<TokenClaims>(token, decoding_key, &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;
    use tessera_storage::signing_key::MemorySigningKeyStore;

    use super::*;
    use crate::{assert_auth_error, testutil};

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    async fn codec_with_key() -> TokenCodec {
        let store = Arc::new(MemorySigningKeyStore::new());
        let active_key = testutil::register_test_key(store.as_ref()).await;
        TokenCodec::builder()
            .active_key(active_key)
            .resolver(Arc::new(StoreKeyResolver::new(store)))
            .token_ids(TokenIdGenerator::new(0).unwrap())
            .token_ttl(Duration::from_secs(3600))
            .build()
    }

    #[test]
    fn test_claims_wire_format() {
        let claims = TokenClaims { jti: 42, sub: 7, exp: 1_700_000_000 };
        let value = serde_json::to_value(claims).unwrap();

        assert_eq!(value["jti"], json!("42"), "jti must serialize as a string");
        assert_eq!(value["sub"], json!("7"), "sub must serialize as a string");
        assert_eq!(value["exp"], json!(1_700_000_000), "exp must serialize as a number");
    }

    #[test]
    fn test_claims_accept_numbers_or_strings() {
        let from_strings: TokenClaims =
            serde_json::from_value(json!({"jti": "42", "sub": "7", "exp": "1700000000"})).unwrap();
        let from_numbers: TokenClaims =
            serde_json::from_value(json!({"jti": 42, "sub": 7, "exp": 1_700_000_000})).unwrap();

        assert_eq!(from_strings, from_numbers);
    }

    #[test]
    fn test_claims_reject_non_numeric_values() {
        let bad_jti = serde_json::from_value::<TokenClaims>(
            json!({"jti": "not-a-number", "sub": "7", "exp": 1}),
        );
        assert!(bad_jti.is_err());

        let float_sub =
            serde_json::from_value::<TokenClaims>(json!({"jti": "1", "sub": 2.5, "exp": 1}));
        assert!(float_sub.is_err());
    }

    #[test]
    fn test_claims_ignore_extra_fields() {
        let claims: TokenClaims =
            serde_json::from_value(json!({"jti": "1", "sub": "2", "exp": 3, "iat": 0, "iss": "x"}))
                .unwrap();
        assert_eq!(claims, TokenClaims { jti: 1, sub: 2, exp: 3 });
    }

    #[tokio::test]
    async fn test_generate_then_decode_roundtrip() {
        let codec = codec_with_key().await;
        let now = fixed_now();

        let issued = codec.generate(UserId::from(7), now).unwrap();
        let decoded = codec.decode(&issued.token, now).await.unwrap();

        assert_eq!(decoded.token_id, issued.token_id);
        assert_eq!(decoded.user_id, UserId::from(7));
        assert_eq!(decoded.expire_at, issued.expire_at);
    }

    #[tokio::test]
    async fn test_header_carries_decimal_kid() {
        let codec = codec_with_key().await;
        let issued = codec.generate(UserId::from(1), fixed_now()).unwrap();

        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        let kid = header.kid.expect("kid present");
        assert!(kid.parse::<i64>().is_ok(), "kid must be a decimal string, got {kid:?}");
        assert_eq!(header.alg, Algorithm::RS512);
    }

    #[tokio::test]
    async fn test_decode_expired_at_boundary() {
        let codec = codec_with_key().await;
        let now = fixed_now();
        let issued = codec.generate(UserId::from(7), now).unwrap();

        // One second before expiry the token is still valid.
        let near_expiry = issued.expire_at - chrono::Duration::seconds(1);
        assert!(codec.decode(&issued.token, near_expiry).await.is_ok());

        // At exactly the expiry instant it is not.
        let result = codec.decode(&issued.token, issued.expire_at).await;
        assert_auth_error!(result, TokenExpired);
    }

    #[tokio::test]
    async fn test_decode_unknown_kid() {
        let codec = codec_with_key().await;
        let now = fixed_now();

        let claims = TokenClaims { jti: 1, sub: 2, exp: now.timestamp() + 600 };
        let token = testutil::sign_claims_with_kid(&claims, Some("999"));

        let result = codec.decode(&token, now).await;
        assert_auth_error!(result, KeyNotFound);
    }

    #[tokio::test]
    async fn test_decode_non_numeric_kid() {
        let codec = codec_with_key().await;
        let now = fixed_now();

        let claims = TokenClaims { jti: 1, sub: 2, exp: now.timestamp() + 600 };
        let token = testutil::sign_claims_with_kid(&claims, Some("key-2024"));

        let result = codec.decode(&token, now).await;
        assert_auth_error!(result, KeyNotFound);
    }

    #[tokio::test]
    async fn test_decode_missing_kid() {
        let codec = codec_with_key().await;
        let now = fixed_now();

        let claims = TokenClaims { jti: 1, sub: 2, exp: now.timestamp() + 600 };
        let token = testutil::sign_claims_with_kid(&claims, None);

        let result = codec.decode(&token, now).await;
        assert_auth_error!(result, MissingKeyId);
    }

    #[tokio::test]
    async fn test_decode_wrong_key_signature() {
        let codec = codec_with_key().await;
        let now = fixed_now();
        let issued = codec.generate(UserId::from(7), now).unwrap();

        // Correct kid, signed by a different private key.
        let kid = jsonwebtoken::decode_header(&issued.token).unwrap().kid.unwrap();
        let claims = TokenClaims { jti: 1, sub: 7, exp: now.timestamp() + 600 };
        let forged = testutil::sign_claims_with_key(
            &claims,
            Some(&kid),
            &testutil::test_keypair_alt().private_key_pem,
        );

        let result = codec.decode(&forged, now).await;
        assert_auth_error!(result, InvalidSignature);
    }

    #[tokio::test]
    async fn test_decode_tampered_payload() {
        let codec = codec_with_key().await;
        let now = fixed_now();
        let issued = codec.generate(UserId::from(7), now).unwrap();

        let tampered = testutil::swap_payload(
            &issued.token,
            &json!({"jti": "1", "sub": "999", "exp": now.timestamp() + 600}),
        );

        let result = codec.decode(&tampered, now).await;
        assert_auth_error!(result, InvalidSignature);
    }
}
