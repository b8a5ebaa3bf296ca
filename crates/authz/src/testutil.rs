//! Shared test utilities for authorization testing.
//!
//! This module provides helpers for generating Ed25519 key pairs, signing
//! bearer tokens, crafting raw token strings (for attack testing), and
//! building key sets and key sources around generated keys. It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tasklane-authz = { path = "../authz", features = ["testutil"] }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::OsRng;
use serde_json::{json, Value};
use tasklane_keys::{Jwk, KeyMaterial, SigningKeySet, StaticKeySource};
use zeroize::Zeroizing;

/// Generates a test Ed25519 key pair.
///
/// Returns `(pkcs8_der, public_key_base64url)` where:
/// - `pkcs8_der` is the private key in PKCS#8 DER format wrapped in
///   [`Zeroizing`] (suitable for [`EncodingKey::from_ed_der`])
/// - `public_key_base64url` is the 32-byte public key encoded as base64url
///   without padding (suitable for an OKP [`Jwk`])
///
/// The private key material is wrapped in [`Zeroizing`] to ensure it is
/// scrubbed from memory on drop, even in test code.
///
/// Each call generates a fresh random key pair.
pub fn generate_test_keypair() -> (Zeroizing<Vec<u8>>, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_bytes = signing_key.verifying_key().to_bytes();
    let public_key_b64 = URL_SAFE_NO_PAD.encode(public_key_bytes);

    // Wrap intermediate private bytes in Zeroizing to scrub from memory on drop.
    let private_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes());
    let mut pkcs8_der = Zeroizing::new(vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
    ]);
    pkcs8_der.extend_from_slice(&*private_bytes);

    (pkcs8_der, public_key_b64)
}

/// Builds an OKP [`Jwk`] for a generated public key.
#[must_use]
pub fn test_jwk(kid: &str, public_key_b64: &str) -> Jwk {
    Jwk {
        kid: kid.to_string(),
        alg: Some("EdDSA".to_string()),
        key_use: Some("sig".to_string()),
        material: KeyMaterial::Okp { crv: "Ed25519".to_string(), x: public_key_b64.to_string() },
    }
}

/// Builds a single-key [`SigningKeySet`] for a generated public key.
#[must_use]
pub fn test_key_set(kid: &str, public_key_b64: &str) -> SigningKeySet {
    SigningKeySet::new(
        "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_TestPool/.well-known/jwks.json",
        vec![test_jwk(kid, public_key_b64)],
    )
}

/// Generates a key pair and wraps its public half in a [`StaticKeySource`].
///
/// Returns `(pkcs8_der, source)`; tokens signed with the private key verify
/// against the source under the given `kid`.
pub fn test_key_source(kid: &str) -> (Zeroizing<Vec<u8>>, StaticKeySource) {
    let (pkcs8_der, public_key_b64) = generate_test_keypair();
    let source = StaticKeySource::new(test_key_set(kid, &public_key_b64));
    (pkcs8_der, source)
}

/// Standard claims for a test token: `sub`, `iss`, `aud`, fresh `iat`,
/// one-hour `exp`, and a derived `email`.
///
/// Extend the returned value to add or override claims (e.g. group lists).
#[must_use]
pub fn standard_claims(sub: &str, audience: &str) -> Value {
    let now = Utc::now().timestamp() as u64;
    json!({
        "sub": sub,
        "iss": "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_TestPool",
        "aud": audience,
        "exp": now + 3600,
        "iat": now,
        "email": format!("{sub}@example.com"),
    })
}

/// Signs a token over arbitrary claims with an Ed25519 key in PKCS#8 DER
/// format, setting the given `kid` header.
///
/// # Panics
///
/// Panics if encoding fails (should not happen with valid inputs).
pub fn signed_token(pkcs8_der: &[u8], kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(kid.to_string());

    let encoding_key = EncodingKey::from_ed_der(pkcs8_der);
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("failed to encode test token")
}

/// Creates a raw token string from arbitrary header and payload JSON.
///
/// The resulting token has the structure `{header_b64}.{payload_b64}.` with
/// an empty signature. This is useful for testing rejection of malformed or
/// attack tokens (e.g., `alg: "none"`, algorithm confusion).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a `Result<T, AuthError>` is an `Err` matching the given
/// [`AuthError`](crate::error::AuthError) variant.
///
/// Works with any variant. On failure, prints the expected variant and the
/// actual result for debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use tasklane_authz::assert_auth_error;
/// use tasklane_authz::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::TokenExpired);
/// assert_auth_error!(result, TokenExpired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
