//! Key resolution error types.
//!
//! This module defines errors that can occur while resolving or converting
//! published signing keys.

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for key resolution operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors that can occur while resolving a signing key set or converting
/// published key material.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyError {
    /// The key set could not be fetched from the trust domain's endpoint.
    ///
    /// Covers connection failures, timeouts, non-success HTTP statuses, and
    /// unparseable response bodies. This is the only possibly-transient
    /// failure in the crate; callers may retry the whole request.
    #[error("Key source unavailable: {message}")]
    Unavailable {
        /// Description of the fetch failure.
        message: String,
        /// The underlying error that caused the fetch to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Published key material could not be converted into a verification key.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl KeyError {
    /// Creates a new `Unavailable` error with the given message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into(), source: None }
    }

    /// Creates a new `Unavailable` error with a message and source error.
    #[must_use]
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `InvalidKeyMaterial` error with the given message.
    #[must_use]
    pub fn invalid_key_material(message: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial(message.into())
    }
}

impl From<reqwest::Error> for KeyError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_status() {
            match err.status() {
                Some(status) => format!("endpoint returned {status}"),
                None => "endpoint returned a non-success status".to_string(),
            }
        } else if err.is_decode() {
            "response body could not be decoded".to_string()
        } else {
            "request failed".to_string()
        };

        Self::Unavailable { message, source: Some(Arc::new(err)) }
    }
}
