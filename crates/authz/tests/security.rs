//! Security-focused token validation tests.
//!
//! These tests verify the validation pipeline's resistance to common bearer
//! token attack vectors: algorithm substitution, signature tampering,
//! expired and mis-audienced tokens, stale key sets after rotation, and
//! malformed token structures.
#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde_json::json;
use tasklane_authz::{
    assert_auth_error,
    error::AuthError,
    testutil::{
        craft_raw_token, generate_test_keypair, signed_token, standard_claims, test_key_set,
        test_key_source,
    },
    token::validate_token,
    TrustDomainConfig,
};
use tasklane_keys::{KeyError, KeyResult, KeySource, SigningKeySet};

const REGION: &str = "us-east-1";

fn test_config() -> TrustDomainConfig {
    TrustDomainConfig::new("us-east-1_TestPool", "client-abc", "admin")
}

/// Key source that fails every fetch, simulating an unreachable trust
/// domain endpoint.
struct FailingKeySource;

#[async_trait]
impl KeySource for FailingKeySource {
    async fn get_keys(&self, _jwks_url: &str) -> KeyResult<Arc<SigningKeySet>> {
        Err(KeyError::unavailable("connection refused"))
    }
}

#[tokio::test]
async fn valid_token_yields_its_claims() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "client-abc"));

    let claims = validate_token(&token, &source, &test_config(), REGION)
        .await
        .expect("valid token must verify");

    assert_eq!(claims.sub, "user-42");
    assert_eq!(claims.aud.as_deref(), Some("client-abc"));
    assert_eq!(claims.email.as_deref(), Some("user-42@example.com"));
    assert!(claims.groups.is_none());
}

#[tokio::test]
async fn alg_none_rejected_before_key_lookup() {
    // An alg:none token must never reach the key source
    let (_, source) = test_key_source("key-001");
    let token = craft_raw_token(
        &json!({"alg": "none", "kid": "key-001"}),
        &standard_claims("user-42", "client-abc"),
    );

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, UnsupportedAlgorithm);
}

#[tokio::test]
async fn symmetric_algorithm_rejected() {
    let (_, source) = test_key_source("key-001");
    let token = craft_raw_token(
        &json!({"alg": "HS256", "kid": "key-001"}),
        &standard_claims("user-42", "client-abc"),
    );

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, UnsupportedAlgorithm);
}

#[tokio::test]
async fn forbidden_algorithm_beats_key_source_failure() {
    // Algorithm checks run before any fetch, so even with a dead key source
    // the rejection reason is the algorithm.
    let token = craft_raw_token(
        &json!({"alg": "none", "kid": "key-001"}),
        &standard_claims("user-42", "client-abc"),
    );

    let result = validate_token(&token, &FailingKeySource, &test_config(), REGION).await;
    assert_auth_error!(result, UnsupportedAlgorithm);
}

#[tokio::test]
async fn tampered_payload_fails_signature_check() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "client-abc"));

    // Swap the payload for one claiming a different subject
    let parts: Vec<&str> = token.split('.').collect();
    let mut forged_claims = standard_claims("user-43", "client-abc");
    forged_claims["sub"] = json!("admin-user");
    let forged_payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).expect("payload json"));
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    let result = validate_token(&forged, &source, &test_config(), REGION).await;
    assert_auth_error!(result, SignatureInvalid);
}

#[tokio::test]
async fn token_signed_by_wrong_key_rejected() {
    // Register one key pair under the kid, sign with a different one
    let (_, source) = test_key_source("key-001");
    let (other_der, _) = generate_test_keypair();
    let token = signed_token(&other_der, "key-001", &standard_claims("user-42", "client-abc"));

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, SignatureInvalid);
}

#[tokio::test]
async fn unknown_kid_is_key_not_found() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let token = signed_token(&pkcs8_der, "key-999", &standard_claims("user-42", "client-abc"));

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert!(
        matches!(&result, Err(AuthError::KeyNotFound { kid }) if kid == "key-999"),
        "expected KeyNotFound for key-999, got: {result:?}"
    );
}

#[tokio::test]
async fn rotation_stale_set_is_key_not_found() {
    // A rotation the process has not observed: the set no longer contains
    // the signing key, which must surface as KeyNotFound, not as a bad
    // signature.
    let (pkcs8_der, source) = test_key_source("key-001");
    let (_, rotated_public) = generate_test_keypair();
    source.replace(test_key_set("key-002", &rotated_public));

    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "client-abc"));
    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, KeyNotFound);
}

#[tokio::test]
async fn expired_token_rejected_despite_valid_signature() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let now = Utc::now().timestamp() as u64;
    let mut claims = standard_claims("user-42", "client-abc");
    claims["exp"] = json!(now - 60);
    let token = signed_token(&pkcs8_der, "key-001", &claims);

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, TokenExpired);
}

#[tokio::test]
async fn missing_exp_rejected_as_expired() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let mut claims = standard_claims("user-42", "client-abc");
    claims.as_object_mut().expect("object").remove("exp");
    let token = signed_token(&pkcs8_der, "key-001", &claims);

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, TokenExpired);
}

#[tokio::test]
async fn wrong_audience_rejected() {
    let (pkcs8_der, source) = test_key_source("key-001");
    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "other-client"));

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, AudienceMismatch);
}

#[tokio::test]
async fn missing_kid_is_malformed() {
    let (pkcs8_der, source) = test_key_source("key-001");

    // Sign without setting a kid header
    let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::EdDSA);
    let encoding_key = jsonwebtoken::EncodingKey::from_ed_der(&pkcs8_der);
    let token =
        jsonwebtoken::encode(&header, &standard_claims("user-42", "client-abc"), &encoding_key)
            .expect("encode");

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, MalformedToken);
}

#[tokio::test]
async fn structurally_malformed_tokens_rejected() {
    let (_, source) = test_key_source("key-001");
    let config = test_config();

    for input in ["", "only.two", "too.many.parts.here", "!!!.!!!.!!!", "not-a-token"] {
        let result = validate_token(input, &source, &config, REGION).await;
        assert_auth_error!(result, MalformedToken, input);
    }
}

#[tokio::test]
async fn key_source_failure_surfaces_as_unavailable() {
    let (pkcs8_der, _) = generate_test_keypair();
    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "client-abc"));

    let result = validate_token(&token, &FailingKeySource, &test_config(), REGION).await;
    assert_auth_error!(result, KeySourceUnavailable);
}

#[tokio::test]
async fn corrupt_key_material_rejected() {
    // A key set entry whose material is not a valid curve point
    let source = tasklane_keys::StaticKeySource::new(test_key_set("key-001", "AAAA"));
    let (pkcs8_der, _) = generate_test_keypair();
    let token = signed_token(&pkcs8_der, "key-001", &standard_claims("user-42", "client-abc"));

    let result = validate_token(&token, &source, &test_config(), REGION).await;
    assert_auth_error!(result, InvalidKeyMaterial);
}
