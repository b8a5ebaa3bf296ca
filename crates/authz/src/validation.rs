//! Signature-algorithm validation.
//!
//! # Security
//!
//! Algorithm checks run before any key lookup or network activity:
//! - Strict allow-listing to prevent algorithm substitution attacks
//! - Only asymmetric algorithms (RS256, EdDSA) are accepted
//! - Symmetric algorithms and "none" are always rejected

use jsonwebtoken::Algorithm;

use crate::error::AuthError;

/// Forbidden token algorithms that are never accepted for security reasons.
///
/// These algorithms are blocked because:
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted token algorithms.
///
/// RS256 covers the keys identity-provider user pools publish in production;
/// EdDSA (Ed25519) covers locally generated test key pairs. Per RFC 8725
/// Section 3.1, algorithms without end-to-end verification support are not
/// listed here — they would only produce confusing errors at the signature
/// verification stage.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256", "EdDSA"];

/// Validates a token algorithm against security policies.
///
/// Enforces strict algorithm security per RFC 8725:
/// - ALWAYS rejects symmetric algorithms (HS256, HS384, HS512)
/// - ALWAYS rejects the "none" algorithm
/// - Only accepts algorithms in [`ACCEPTED_ALGORITHMS`]
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for any algorithm outside the
/// accepted list.
///
/// # Examples
///
/// ```
/// use tasklane_authz::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("EdDSA").is_ok());
///
/// // Symmetric algorithm rejected
/// assert!(validate_algorithm("HS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    // Check against forbidden algorithms
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    // Check if in accepted list
    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "algorithm '{alg}' is not in the accepted list"
        )));
    }

    Ok(())
}

/// Maps an accepted algorithm name onto the verification library's enum.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for any name outside
/// [`ACCEPTED_ALGORITHMS`].
pub fn to_algorithm(alg: &str) -> Result<Algorithm, AuthError> {
    match alg {
        "RS256" => Ok(Algorithm::RS256),
        "EdDSA" => Ok(Algorithm::EdDSA),
        other => Err(AuthError::unsupported_algorithm(format!(
            "algorithm '{other}' is not in the accepted list"
        ))),
    }
}
