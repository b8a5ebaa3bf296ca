//! Token decoding and claim validation.
//!
//! [`validate_token`] runs the full verification pipeline for one bearer
//! token, short-circuiting on the first failure:
//!
//! 1. Structural decode of the header segment (→ `MalformedToken`)
//! 2. Algorithm allow-listing (→ `UnsupportedAlgorithm`)
//! 3. Key-set resolution through the injected [`KeySource`]
//!    (→ `KeySourceUnavailable`)
//! 4. `kid` lookup (→ `KeyNotFound`)
//! 5. Signature verification (→ `SignatureInvalid`)
//! 6. Expiry check (→ `TokenExpired`)
//! 7. Audience check (→ `AudienceMismatch`)
//!
//! There are no retries here; a transient key-source failure surfaces
//! immediately and the caller may retry the whole request.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tasklane_keys::{to_decoding_key, KeySource};

use crate::{
    config::TrustDomainConfig,
    error::AuthError,
    validation::{to_algorithm, validate_algorithm},
};

/// The decoded (unverified) header segment of a bearer token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm named by the token.
    pub alg: String,

    /// Identifier of the signing key, matched against the current key set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type (`JWT` when present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// The verified claim set of a bearer token.
///
/// Created only as the output of successful verification; discarded when the
/// request completes. Unknown claims are ignored on decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the caller's unique identifier, used as the policy principal.
    pub sub: String,

    /// Issuer URL of the user pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience: the app client the token was issued for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Issued at (seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Group memberships assigned in the user pool, in pool order.
    #[serde(rename = "cognito:groups", skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    /// Verified email attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    /// Returns the first group membership, if any.
    ///
    /// Administrative eligibility is decided from this element alone.
    #[must_use]
    pub fn first_group(&self) -> Option<&str> {
        self.groups.as_ref().and_then(|groups| groups.first()).map(String::as_str)
    }
}

/// Decodes a token's header segment without verifying anything.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token does not have three
/// dot-separated segments or the first segment is not base64url-encoded JSON.
pub fn decode_token_header(token: &str) -> Result<TokenHeader, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::malformed_token(
            "token must have 3 segments separated by dots",
        ));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(parts[0])
        .map_err(|err| AuthError::malformed_token(format!("failed to decode header: {err}")))?;

    serde_json::from_slice(&header_bytes)
        .map_err(|err| AuthError::malformed_token(format!("failed to parse header: {err}")))
}

/// Verifies a token's signature with the given key and returns its claims.
///
/// Expiry and audience are deliberately not validated at this stage so the
/// later checks can produce their own distinguishable errors.
///
/// # Errors
///
/// Returns [`AuthError::SignatureInvalid`] on mismatch, or a decoding error
/// mapped onto the taxonomy.
pub fn verify_signature(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let token_data = decode::<Claims>(token, key, &validation)?;

    Ok(token_data.claims)
}

/// Validates the time and audience claims of a verified token.
///
/// # Errors
///
/// Returns an error if:
/// - `exp` is missing or not in the future ([`AuthError::TokenExpired`])
/// - `aud` is missing or differs from `expected_audience`
///   ([`AuthError::AudienceMismatch`])
pub fn validate_claims(claims: &Claims, expected_audience: &str) -> Result<(), AuthError> {
    let now = Utc::now().timestamp() as u64;

    match claims.exp {
        Some(exp) if exp > now => {}
        _ => return Err(AuthError::TokenExpired),
    }

    match claims.aud.as_deref() {
        Some(aud) if aud == expected_audience => {}
        _ => {
            return Err(AuthError::audience_mismatch(format!(
                "token was not issued for '{expected_audience}'"
            )))
        }
    }

    Ok(())
}

/// Runs the full verification pipeline for one bearer token.
///
/// The key set is resolved through `key_source` against the trust domain's
/// published endpoint for `region`.
///
/// # Errors
///
/// See the module documentation for the failure taxonomy; every step's
/// failure is terminal and distinguishable.
#[tracing::instrument(skip(token, key_source, config))]
pub async fn validate_token(
    token: &str,
    key_source: &dyn KeySource,
    config: &TrustDomainConfig,
    region: &str,
) -> Result<Claims, AuthError> {
    let header = decode_token_header(token)?;
    validate_algorithm(&header.alg)?;
    let kid = header
        .kid
        .as_deref()
        .ok_or_else(|| AuthError::malformed_token("token header missing 'kid'"))?;

    let jwks_url = config.jwks_url(region);
    let keys = key_source.get_keys(&jwks_url).await?;

    let jwk = keys.find(kid).ok_or_else(|| {
        tracing::warn!(
            kid,
            fetched_at = %keys.fetched_at(),
            "signing key not in current key set"
        );
        AuthError::key_not_found(kid)
    })?;

    let decoding_key = to_decoding_key(jwk)?;
    let algorithm = to_algorithm(&header.alg)?;

    let claims = verify_signature(token, &decoding_key, algorithm)?;
    validate_claims(&claims, &config.audience)?;

    tracing::debug!(sub = %claims.sub, "token verified");
    Ok(claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testutil::craft_raw_token;

    fn claims_with(exp: Option<u64>, aud: Option<&str>) -> Claims {
        Claims {
            sub: "user-42".into(),
            iss: None,
            aud: aud.map(str::to_string),
            exp,
            iat: None,
            groups: None,
            email: None,
        }
    }

    fn future_exp() -> u64 {
        Utc::now().timestamp() as u64 + 3600
    }

    #[test]
    fn test_decode_token_header() {
        let token = craft_raw_token(
            &json!({"alg": "RS256", "kid": "key-001", "typ": "JWT"}),
            &json!({"sub": "user-42"}),
        );

        let header = decode_token_header(&token).expect("decode header");
        assert_eq!(header.alg, "RS256");
        assert_eq!(header.kid.as_deref(), Some("key-001"));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_decode_token_header_two_segments() {
        let result = decode_token_header("only.two");
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_decode_token_header_four_segments() {
        let result = decode_token_header("too.many.parts.here");
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_decode_token_header_invalid_base64() {
        let result = decode_token_header("!!!.payload.signature");
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_decode_token_header_invalid_json() {
        let header = URL_SAFE_NO_PAD.encode(b"not-json");
        let result = decode_token_header(&format!("{header}.payload.signature"));
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_validate_claims_ok() {
        let claims = claims_with(Some(future_exp()), Some("client-abc"));
        assert!(validate_claims(&claims, "client-abc").is_ok());
    }

    #[test]
    fn test_validate_claims_expired() {
        let claims = claims_with(Some(1_000_000_000), Some("client-abc"));
        let result = validate_claims(&claims, "client-abc");
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_validate_claims_missing_exp() {
        let claims = claims_with(None, Some("client-abc"));
        let result = validate_claims(&claims, "client-abc");
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_validate_claims_wrong_audience() {
        let claims = claims_with(Some(future_exp()), Some("other-client"));
        let result = validate_claims(&claims, "client-abc");
        assert!(matches!(result, Err(AuthError::AudienceMismatch(_))));
    }

    #[test]
    fn test_validate_claims_missing_audience() {
        let claims = claims_with(Some(future_exp()), None);
        let result = validate_claims(&claims, "client-abc");
        assert!(matches!(result, Err(AuthError::AudienceMismatch(_))));
    }

    #[test]
    fn test_expiry_checked_before_audience() {
        let claims = claims_with(Some(1_000_000_000), Some("other-client"));
        let result = validate_claims(&claims, "client-abc");
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_first_group() {
        let mut claims = claims_with(Some(future_exp()), None);
        assert_eq!(claims.first_group(), None);

        claims.groups = Some(vec![]);
        assert_eq!(claims.first_group(), None);

        claims.groups = Some(vec!["ops".into(), "admin".into()]);
        assert_eq!(claims.first_group(), Some("ops"));
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        /// Strategy for generating `Claims` instances with arbitrary field
        /// values.
        fn arb_claims() -> impl Strategy<Value = Claims> {
            (
                "[a-zA-Z0-9-]{1,64}",                                     // sub
                proptest::option::of("[a-zA-Z0-9:/._-]{1,64}"),           // iss
                proptest::option::of("[a-zA-Z0-9-]{1,64}"),               // aud
                proptest::option::of(1_000_000_000u64..2_000_000_000u64), // exp
                proptest::option::of(1_000_000_000u64..2_000_000_000u64), // iat
                proptest::option::of(proptest::collection::vec("[a-z]{1,16}", 0..4)),
                proptest::option::of("[a-z]{1,10}@[a-z]{1,10}\\.com"),    // email
            )
                .prop_map(|(sub, iss, aud, exp, iat, groups, email)| Claims {
                    sub,
                    iss,
                    aud,
                    exp,
                    iat,
                    groups,
                    email,
                })
        }

        proptest! {
            /// Serializing then deserializing any `Claims` must produce an
            /// identical struct.
            #[test]
            fn claims_serde_round_trip(claims in arb_claims()) {
                let json = serde_json::to_string(&claims).expect("serialize should succeed");
                let deserialized: Claims =
                    serde_json::from_str(&json).expect("deserialize should succeed");
                prop_assert_eq!(deserialized, claims);
            }

            /// The group list keeps its wire name.
            #[test]
            fn claims_group_wire_name(claims in arb_claims()) {
                let json = serde_json::to_string(&claims).expect("serialize should succeed");
                let parsed: serde_json::Value =
                    serde_json::from_str(&json).expect("output must be valid JSON");
                if claims.groups.is_some() {
                    prop_assert!(parsed.get("cognito:groups").is_some());
                } else {
                    prop_assert!(parsed.get("cognito:groups").is_none());
                }
            }
        }
    }

    /// Known-bad token inputs must produce errors, never panics.
    mod malformed_inputs {
        use super::*;

        fn exercise(token: &str) -> bool {
            decode_token_header(token).is_ok()
        }

        #[test]
        fn empty_input_no_panic() {
            assert!(!exercise(""));
        }

        #[test]
        fn dots_only_no_panic() {
            assert!(!exercise("."));
            assert!(!exercise(".."));
            assert!(!exercise("..."));
        }

        #[test]
        fn plain_string_no_panic() {
            assert!(!exercise("not-a-token"));
        }

        #[test]
        fn invalid_segments_no_panic() {
            assert!(!exercise("!!!.!!!.!!!"));
        }

        #[test]
        fn newlines_in_token_no_panic() {
            assert!(!exercise("eyJhbGciOiJSUzI1NiJ9\n.eyJzdWIiOiJ4In0\n."));
        }

        #[test]
        fn unicode_no_panic() {
            assert!(!exercise("\u{1F4A9}.\u{FEFF}.\u{202E}"));
        }
    }
}
