//! Fuzz target for the token parsing path.
//!
//! Feeds arbitrary byte strings through header decoding, algorithm
//! validation, and claim deserialization. Every outcome must be a clean
//! `Ok`/`Err`; panics and hangs are findings.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_authn::{TokenClaims, validate_algorithm};

fuzz_target!(|data: &[u8]| {
    // Tokens are always UTF-8 strings.
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(header) = jsonwebtoken::decode_header(token) {
        let _ = validate_algorithm(&format!("{:?}", header.alg));
        if let Some(kid) = header.kid {
            let _ = kid.parse::<i64>();
        }
    }

    // The payload segment parses independently of the signature.
    if let Some(payload) = token.split('.').nth(1) {
        use base64::Engine as _;
        if let Ok(bytes) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload) {
            let _ = serde_json::from_slice::<TokenClaims>(&bytes);
        }
    }
});
