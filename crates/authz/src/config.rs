//! Trust-domain configuration.
//!
//! The authorizer is configured against exactly one trust domain: the
//! identity-provider user pool whose published keys verify inbound tokens.
//! In deployment the three values arrive through the environment
//! ([`TrustDomainConfig::from_env`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_POOL_ID_VAR: &str = "USER_POOL_ID";
const APP_CLIENT_ID_VAR: &str = "APP_CLIENT_ID";
const ADMIN_GROUP_NAME_VAR: &str = "ADMIN_GROUP_NAME";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
}

/// Configuration for the trust domain the authorizer validates against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDomainConfig {
    /// Identifier of the user pool that issues tokens (e.g.
    /// `us-east-1_1A2b3C4d5`).
    pub user_pool_id: String,

    /// Expected `aud` claim value: the app client the token must have been
    /// issued for.
    pub audience: String,

    /// Name of the group whose members receive the administrative rule set.
    pub admin_group: String,
}

impl TrustDomainConfig {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub fn new(
        user_pool_id: impl Into<String>,
        audience: impl Into<String>,
        admin_group: impl Into<String>,
    ) -> Self {
        Self {
            user_pool_id: user_pool_id.into(),
            audience: audience.into(),
            admin_group: admin_group.into(),
        }
    }

    /// Loads the configuration from the environment.
    ///
    /// Reads `USER_POOL_ID`, `APP_CLIENT_ID`, and `ADMIN_GROUP_NAME`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] naming the first variable that is
    /// not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let require =
            |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        Ok(Self {
            user_pool_id: require(USER_POOL_ID_VAR)?,
            audience: require(APP_CLIENT_ID_VAR)?,
            admin_group: require(ADMIN_GROUP_NAME_VAR)?,
        })
    }

    /// Returns the user pool's published key-set endpoint for the given
    /// region.
    #[must_use]
    pub fn jwks_url(&self, region: &str) -> String {
        format!(
            "https://cognito-idp.{region}.amazonaws.com/{}/.well-known/jwks.json",
            self.user_pool_id
        )
    }
}
