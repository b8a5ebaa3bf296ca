//! Published verification-key types.
//!
//! The trust domain publishes its current public signing keys as a JSON
//! document (`{"keys": [...]}`) at a well-known endpoint. This module defines
//! the wire types for that document ([`JwksDocument`], [`Jwk`]), the in-memory
//! key set built from it ([`SigningKeySet`]), and the conversion from
//! published key material to a verification key ([`to_decoding_key`]).
//!
//! # Key types
//!
//! Two kinds of key material are accepted:
//!
//! - **RSA** (`kty: "RSA"`) — modulus and exponent as base64url strings, the
//!   format identity-provider user pools publish in production
//! - **OKP** (`kty: "OKP"`, `crv: "Ed25519"`) — a 32-byte Ed25519 public key
//!   as base64url, used by locally generated test key pairs
//!
//! Symmetric key types are not representable here; tokens signed with them
//! are rejected before any key lookup happens.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// The JSON document published at the trust domain's well-known endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JwksDocument {
    /// The published verification keys.
    pub keys: Vec<Jwk>,
}

/// One published verification key.
///
/// The `kid` uniquely identifies the key within the set and must match the
/// `kid` header of tokens verified against it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID (matches the token's `kid` header).
    pub kid: String,

    /// Signature algorithm the key is intended for (e.g., `RS256`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended key use (`sig` for signature verification).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// The key material, tagged by `kty`.
    #[serde(flatten)]
    pub material: KeyMaterial,
}

/// Published key material, tagged by key type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum KeyMaterial {
    /// An RSA public key as base64url-encoded modulus and exponent.
    #[serde(rename = "RSA")]
    Rsa {
        /// Modulus (base64url, no padding).
        n: String,
        /// Public exponent (base64url, no padding), typically `AQAB`.
        e: String,
    },

    /// An Octet Key Pair public key (only the Ed25519 curve is accepted).
    #[serde(rename = "OKP")]
    Okp {
        /// Curve name; must be `Ed25519`.
        crv: String,
        /// The 32-byte public key (base64url, no padding).
        x: String,
    },
}

/// The resolved set of public signing keys for a trust domain.
///
/// Built once from a fetched [`JwksDocument`] and never mutated afterwards.
/// `fetched_at` records when the set was resolved so diagnostics can report
/// staleness when a `kid` lookup misses after a key rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct SigningKeySet {
    source_url: String,
    fetched_at: DateTime<Utc>,
    keys: HashMap<String, Jwk>,
}

impl SigningKeySet {
    /// Builds a key set from published keys, indexed by `kid`.
    ///
    /// If the document contains duplicate `kid`s, the last one wins.
    #[must_use]
    pub fn new(source_url: impl Into<String>, keys: Vec<Jwk>) -> Self {
        let keys = keys.into_iter().map(|key| (key.kid.clone(), key)).collect();
        Self { source_url: source_url.into(), fetched_at: Utc::now(), keys }
    }

    /// Returns the key with the given `kid`, if present.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    /// Returns the number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the set contains no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the endpoint URL the set was fetched from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Returns when the set was resolved.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Converts published key material into a verification key.
///
/// Ed25519 material is length-checked and parsed as a curve point before
/// use, so malformed published keys fail here rather than deep inside
/// signature verification.
///
/// # Errors
///
/// Returns [`KeyError::InvalidKeyMaterial`] if:
/// - RSA components are not valid base64url
/// - The OKP curve is not `Ed25519`
/// - The OKP `x` coordinate is not valid base64url, is not 32 bytes, or is
///   not a valid curve point
pub fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, KeyError> {
    match &jwk.material {
        KeyMaterial::Rsa { n, e } => DecodingKey::from_rsa_components(n, e)
            .map_err(|err| KeyError::invalid_key_material(format!("RSA components: {err}"))),
        KeyMaterial::Okp { crv, x } => {
            if crv != "Ed25519" {
                return Err(KeyError::invalid_key_material(format!(
                    "unsupported OKP curve '{crv}'"
                )));
            }

            let point_bytes = URL_SAFE_NO_PAD
                .decode(x.as_bytes())
                .map_err(|err| KeyError::invalid_key_material(format!("base64 decode: {err}")))?;

            // Ed25519 public keys are 32 bytes
            if point_bytes.len() != PUBLIC_KEY_LENGTH {
                return Err(KeyError::invalid_key_material(format!(
                    "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                    point_bytes.len()
                )));
            }

            let point: [u8; PUBLIC_KEY_LENGTH] = point_bytes[..PUBLIC_KEY_LENGTH]
                .try_into()
                .map_err(|_| KeyError::invalid_key_material("failed to convert bytes"))?;

            VerifyingKey::from_bytes(&point).map_err(|err| {
                KeyError::invalid_key_material(format!("invalid Ed25519 key: {err}"))
            })?;

            DecodingKey::from_ed_components(x)
                .map_err(|err| KeyError::invalid_key_material(err.to_string()))
        }
    }
}
