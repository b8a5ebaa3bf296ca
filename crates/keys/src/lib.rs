//! # Tasklane Signing Keys
//!
//! Published verification-key types and key-set resolution for the Tasklane
//! gateway authorizer.
//!
//! This crate provides:
//! - **JWK types**: the published-key data model ([`Jwk`], [`SigningKeySet`])
//! - **Key conversion**: [`to_decoding_key`] for turning published key material
//!   into a verification key
//! - **Key sources**: the [`KeySource`] capability trait with an HTTP-backed
//!   implementation ([`HttpKeySource`]) and a static one for tests
//!   ([`StaticKeySource`])
//!
//! ## Cold-start caching
//!
//! Signing-key rotation is infrequent relative to process lifetime, so
//! [`HttpKeySource`] fetches the trust domain's published key set exactly once
//! per process lifetime and serves the cached set afterwards. A failed fetch
//! is never cached; the next caller retries.
//!
//! ## Example
//!
//! ```no_run
//! use tasklane_keys::{HttpKeySource, KeySource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpKeySource::new();
//! let url = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_Example/.well-known/jwks.json";
//! let keys = source.get_keys(url).await?;
//!
//! println!("key set has {} keys", keys.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Key resolution error types.
pub mod error;
/// Published verification-key types.
pub mod jwk;
/// Key-source capability trait and implementations.
pub mod source;

// Re-export key types for convenience
pub use error::{KeyError, KeyResult};
pub use jwk::{to_decoding_key, Jwk, JwksDocument, KeyMaterial, SigningKeySet};
pub use source::{HttpKeySource, KeySource, StaticKeySource};
