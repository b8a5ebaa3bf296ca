//! Authorization error types.
//!
//! Every failure in the decision pipeline maps to exactly one variant here,
//! so rejections stay distinguishable for logging and diagnostics. None of
//! these reasons leak into a compiled policy document; the enforcement point
//! only ever sees a rejection.

use tasklane_keys::KeyError;
use thiserror::Error;

/// Result type alias for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while evaluating an authorization request.
///
/// All variants are terminal for the current request; nothing is retried
/// internally. [`KeySourceUnavailable`](Self::KeySourceUnavailable) is the
/// only possibly-transient failure — callers may retry the whole request.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The incoming call's addressing string could not be parsed.
    #[error("Malformed addressing: {0}")]
    BadAddressing(String),

    /// The bearer token could not be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The signing key set could not be resolved.
    ///
    /// Wraps the original [`KeyError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Key source unavailable")]
    KeySourceUnavailable(#[source] KeyError),

    /// No key in the current set matches the token's `kid`.
    ///
    /// Not necessarily an attack: the cached key set may be stale after a
    /// rotation. Kept distinct from
    /// [`SignatureInvalid`](Self::SignatureInvalid) for logging purposes,
    /// but still a rejection.
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID that was not found.
        kid: String,
    },

    /// Signature verification failed.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The `exp` claim is missing or in the past.
    #[error("Token expired")]
    TokenExpired,

    /// The `aud` claim is missing or does not match the expected audience.
    #[error("Audience mismatch: {0}")]
    AudienceMismatch(String),

    /// The token's algorithm is not in the accepted list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Published key material could not be converted into a verification key.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A grant named an HTTP verb outside the recognized set.
    #[error("Invalid HTTP verb: {0}")]
    InvalidVerb(String),

    /// A grant named a resource path outside the allowed character class.
    #[error("Invalid resource path: {0}")]
    InvalidResourcePath(String),

    /// `build` was called with no grants recorded.
    #[error("No statements defined for the policy")]
    EmptyPolicy,
}

impl AuthError {
    /// Creates a new `BadAddressing` error.
    #[must_use]
    pub fn bad_addressing(message: impl Into<String>) -> Self {
        Self::BadAddressing(message.into())
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }

    /// Creates a new `KeyNotFound` error for the given key ID.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates a new `AudienceMismatch` error.
    #[must_use]
    pub fn audience_mismatch(message: impl Into<String>) -> Self {
        Self::AudienceMismatch(message.into())
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(message.into())
    }

    /// Creates a new `InvalidVerb` error.
    #[must_use]
    pub fn invalid_verb(verb: impl Into<String>) -> Self {
        Self::InvalidVerb(verb.into())
    }

    /// Creates a new `InvalidResourcePath` error.
    #[must_use]
    pub fn invalid_resource_path(path: impl Into<String>) -> Self {
        Self::InvalidResourcePath(path.into())
    }
}

impl From<KeyError> for AuthError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidKeyMaterial(message) => AuthError::InvalidKeyMaterial(message),
            other => AuthError::KeySourceUnavailable(other),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => AuthError::malformed_token("invalid token structure"),
            ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidAudience => {
                AuthError::audience_mismatch("audience validation failed")
            }
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthError::unsupported_algorithm("algorithm not supported")
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::malformed_token(format!("missing claim: {claim}"))
            }
            _ => AuthError::malformed_token(format!("token error: {err}")),
        }
    }
}
