//! # Tasklane Gateway Authorizer
//!
//! Authorization decision point for the Tasklane API gateway.
//!
//! Given an inbound bearer token and the addressing of the operation being
//! invoked, this crate:
//! - validates the token against the trust domain's rotating set of public
//!   signing keys (signature, expiry, audience)
//! - derives the caller's identity and group membership from the verified
//!   claims
//! - compiles a scoped, resource-level policy document the front-door
//!   enforcement point can apply
//!
//! Any failure along the way is a distinguishable rejection; the enforcement
//! point denies by default when no policy document is produced.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasklane_authz::{Authorizer, TrustDomainConfig};
//! use tasklane_keys::HttpKeySource;
//!
//! # async fn example(token: &str, method_arn: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrustDomainConfig::from_env()?;
//! let authorizer = Authorizer::new(Arc::new(HttpKeySource::new()), config);
//!
//! let response = authorizer.authorize(token, method_arn).await?;
//! println!("granted to {}", response.principal_id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Request orchestration: addressing, rule selection, the decision entry point.
pub mod authorizer;
/// Trust-domain configuration.
pub mod config;
/// Authorization error types.
pub mod error;
/// Policy compilation: grants, statements, the policy builder.
pub mod policy;
/// Token decoding and claim validation.
pub mod token;
/// Signature-algorithm validation.
pub mod validation;

/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-export key types for convenience
pub use authorizer::{Authorizer, MethodArn};
pub use config::{ConfigError, TrustDomainConfig};
pub use error::{AuthError, Result};
pub use policy::{
    ApiScope, AuthorizerResponse, HttpVerb, IdentityContext, PolicyBuilder, PolicyDocument,
};
pub use token::{validate_token, Claims};
pub use validation::{validate_algorithm, ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS};
