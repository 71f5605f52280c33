//! Structured fuzz target for claim deserialization.
//!
//! Builds JSON claim objects where `jti`, `sub`, and `exp` each take an
//! arbitrary JSON shape, then parses them as [`TokenClaims`]. The lenient
//! claim codec must accept integers and decimal strings, reject every
//! other shape, and never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera_authn::TokenClaims;

/// One claim value in any of the shapes a hostile producer might emit.
#[derive(Debug, Arbitrary)]
enum ClaimValue {
    Number(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl ClaimValue {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Number(n) => serde_json::json!(n),
            Self::Unsigned(n) => serde_json::json!(n),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Null => serde_json::Value::Null,
        }
    }

    /// The `i64` the lenient codec should produce, when the shape coerces.
    fn expected(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Unsigned(n) => i64::try_from(*n).ok(),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzedClaims {
    jti: ClaimValue,
    sub: ClaimValue,
    exp: ClaimValue,
}

fuzz_target!(|input: FuzzedClaims| {
    let value = serde_json::json!({
        "jti": input.jti.to_json(),
        "sub": input.sub.to_json(),
        "exp": input.exp.to_json(),
    });

    let parsed = serde_json::from_value::<TokenClaims>(value);
    match (input.jti.expected(), input.sub.expected(), input.exp.expected()) {
        (Some(jti), Some(sub), Some(exp)) => {
            let claims = parsed.expect("all-coercible claims must parse");
            assert_eq!((claims.jti, claims.sub, claims.exp), (jti, sub, exp));
        }
        _ => assert!(parsed.is_err(), "non-coercible claim shape must be rejected"),
    }
});
