//! Shared test fixtures for token testing.
//!
//! RSA key generation is slow, so the fixtures here mint two 2048-bit
//! keypairs once per process and hand out references. The second pair
//! exists for wrong-key and cross-signing scenarios. The module is
//! feature-gated behind `testutil` to keep it out of production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tessera-authn = { path = "../authn", features = ["testutil"] }
//! ```

use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tessera_storage::SigningKeyStore;

use crate::{
    jwt::TokenClaims,
    keys::{ActiveKey, GeneratedKeyPair, generate_rsa_keypair},
};

static TEST_KEYPAIR: OnceLock<GeneratedKeyPair> = OnceLock::new();
static TEST_KEYPAIR_ALT: OnceLock<GeneratedKeyPair> = OnceLock::new();

/// The primary test keypair, generated once per process.
pub fn test_keypair() -> &'static GeneratedKeyPair {
    TEST_KEYPAIR.get_or_init(|| generate_rsa_keypair().expect("test keypair generation"))
}

/// A second keypair, unrelated to [`test_keypair`].
pub fn test_keypair_alt() -> &'static GeneratedKeyPair {
    TEST_KEYPAIR_ALT.get_or_init(|| generate_rsa_keypair().expect("alt test keypair generation"))
}

/// Registers the primary test public key in `store` and returns the
/// matching [`ActiveKey`] for signing.
pub async fn register_test_key(store: &dyn SigningKeyStore) -> ActiveKey {
    let pair = test_keypair();
    let key_id = store.register(&pair.public_key_pem).await.expect("test key registers");
    ActiveKey::from_pem(key_id, &pair.private_key_pem).expect("test private key parses")
}

/// Signs `claims` as RS512 with the primary test key and the given `kid`.
pub fn sign_claims_with_kid(claims: &TokenClaims, kid: Option<&str>) -> String {
    sign_claims_with_key(claims, kid, &test_keypair().private_key_pem)
}

/// Signs `claims` as RS512 with an arbitrary private key PEM.
pub fn sign_claims_with_key(
    claims: &TokenClaims,
    kid: Option<&str>,
    private_key_pem: &str,
) -> String {
    let mut header = Header::new(Algorithm::RS512);
    header.kid = kid.map(str::to_owned);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).expect("test RSA key parses");
    jsonwebtoken::encode(&header, claims, &key).expect("test token signs")
}

/// Builds a raw two-segment-plus-empty-signature JWT from arbitrary JSON.
///
/// No signing happens, which makes this the tool for malformed-header and
/// `alg: none` inputs.
#[must_use]
pub fn craft_raw_jwt(header: &serde_json::Value, payload: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header_b64}.{payload_b64}.")
}

/// Replaces a signed token's payload segment, keeping its header and
/// signature. The result has a signature for the old payload.
#[must_use]
pub fn swap_payload(token: &str, new_payload: &serde_json::Value) -> String {
    let mut parts = token.splitn(3, '.');
    let header = parts.next().unwrap_or_default();
    let _discarded = parts.next();
    let signature = parts.next().unwrap_or_default();

    let payload_b64 = URL_SAFE_NO_PAD.encode(new_payload.to_string());
    format!("{header}.{payload_b64}.{signature}")
}

/// Asserts that a result is an [`AuthError`](crate::error::AuthError) of
/// the given variant.
///
/// ```ignore
/// assert_auth_error!(result, TokenExpired);
/// assert_auth_error!(result, KeyNotFound, "stale kid");
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        match $result {
            Ok(_) => panic!("expected AuthError::{}, got Ok(_)", stringify!($variant)),
            Err($crate::error::AuthError::$variant { .. }) => {}
            Err(other) => {
                panic!("expected AuthError::{}, got: {other:?}", stringify!($variant))
            }
        }
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        match $result {
            Ok(_) => panic!("{}: expected AuthError::{}, got Ok(_)", $msg, stringify!($variant)),
            Err($crate::error::AuthError::$variant { .. }) => {}
            Err(other) => {
                panic!("{}: expected AuthError::{}, got: {other:?}", $msg, stringify!($variant))
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_keypairs_are_distinct() {
        assert_ne!(test_keypair().public_key_pem, test_keypair_alt().public_key_pem);
    }

    #[test]
    fn test_craft_raw_jwt_has_three_segments() {
        let token = craft_raw_jwt(&json!({"alg": "none"}), &json!({"sub": "1"}));
        assert_eq!(token.matches('.').count(), 2);
        assert!(token.ends_with('.'), "unsigned token must have an empty signature");
    }

    #[test]
    fn test_swap_payload_keeps_header_and_signature() {
        let claims = TokenClaims { jti: 1, sub: 2, exp: 3 };
        let token = sign_claims_with_kid(&claims, Some("1"));
        let swapped = swap_payload(&token, &json!({"jti": "9", "sub": "9", "exp": 9}));

        let original: Vec<&str> = token.split('.').collect();
        let modified: Vec<&str> = swapped.split('.').collect();
        assert_eq!(original[0], modified[0]);
        assert_ne!(original[1], modified[1]);
        assert_eq!(original[2], modified[2]);
    }

    #[test]
    fn test_assert_auth_error_accepts_matching_variant() {
        let result: crate::error::Result<()> = Err(crate::error::AuthError::token_expired());
        assert_auth_error!(result, TokenExpired);
    }
}
