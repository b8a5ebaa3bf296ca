//! Request orchestration: addressing, rule selection, the decision entry
//! point.
//!
//! [`Authorizer`] ties the pipeline together for one request:
//!
//! 1. Parse the incoming call's addressing string ([`MethodArn`])
//! 2. Validate the bearer token ([`crate::token::validate_token`])
//! 3. Derive the principal and group membership from the verified claims
//! 4. Grant the fixed self-service rule set, plus the administrative rule
//!    set when the caller's first group matches the configured admin group
//! 5. Compile the policy and attach the identity context
//!
//! The sequence executes to completion or fails atomically; there is no
//! partial-grant state observable by the caller. Any failure is a rejection
//! and the enforcement point denies by default.

use std::{str::FromStr, sync::Arc};

use tasklane_keys::KeySource;

use crate::{
    config::TrustDomainConfig,
    error::AuthError,
    policy::{ApiScope, AuthorizerResponse, HttpVerb, IdentityContext, PolicyBuilder},
    token::validate_token,
};

/// The parsed addressing of an incoming call.
///
/// The wire form is
/// `arn:aws:execute-api:{region}:{account}:{api-id}/{stage}/{verb}/{resource}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodArn {
    /// Deployment region; also selects the trust domain's regional endpoint.
    pub region: String,
    /// Account that owns the API.
    pub account_id: String,
    /// API identifier.
    pub api_id: String,
    /// Deployment stage.
    pub stage: String,
}

impl MethodArn {
    /// Returns the addressing scope used to derive resource identifiers.
    #[must_use]
    pub fn api_scope(&self) -> ApiScope {
        ApiScope {
            region: self.region.clone(),
            account_id: self.account_id.clone(),
            api_id: self.api_id.clone(),
            stage: self.stage.clone(),
        }
    }
}

impl FromStr for MethodArn {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split(':').collect();
        if segments.len() < 6 {
            return Err(AuthError::bad_addressing(format!(
                "expected 6 colon-delimited segments, got {}",
                segments.len()
            )));
        }

        let region = segments[3];
        let account_id = segments[4];

        let trailer: Vec<&str> = segments[5].split('/').collect();
        if trailer.len() < 2 {
            return Err(AuthError::bad_addressing(
                "expected an api-id/stage trailer after the account segment",
            ));
        }

        let api_id = trailer[0];
        let stage = trailer[1];

        if region.is_empty() || account_id.is_empty() || api_id.is_empty() || stage.is_empty() {
            return Err(AuthError::bad_addressing("addressing segment is empty"));
        }

        Ok(Self {
            region: region.to_string(),
            account_id: account_id.to_string(),
            api_id: api_id.to_string(),
            stage: stage.to_string(),
        })
    }
}

/// The authorization decision point.
///
/// Holds the injected [`KeySource`] and trust-domain configuration;
/// constructed once at process start and shared across concurrently
/// evaluated requests.
pub struct Authorizer {
    key_source: Arc<dyn KeySource>,
    config: TrustDomainConfig,
}

impl Authorizer {
    /// Creates an authorizer over the given key source and trust domain.
    #[must_use]
    pub fn new(key_source: Arc<dyn KeySource>, config: TrustDomainConfig) -> Self {
        Self { key_source, config }
    }

    /// Evaluates one authorization request.
    ///
    /// On success, returns the compiled policy plus the identity context
    /// carrying the caller's verified email. On failure, returns the
    /// distinguishable rejection reason; no policy document is produced.
    ///
    /// # Errors
    ///
    /// Any variant of [`AuthError`]; all are terminal for this request.
    #[tracing::instrument(skip(self, token))]
    pub async fn authorize(
        &self,
        token: &str,
        method_arn: &str,
    ) -> Result<AuthorizerResponse, AuthError> {
        let arn: MethodArn = method_arn.parse()?;

        let claims =
            validate_token(token, self.key_source.as_ref(), &self.config, &arn.region).await?;
        let principal_id = claims.sub.clone();

        let mut policy = PolicyBuilder::new(arn.api_scope());

        // Self-service rules, scoped to the caller
        policy.allow(HttpVerb::Get, &format!("/users/{principal_id}"))?;
        policy.allow(HttpVerb::Get, "/tasks/myTasks")?;
        policy.allow(HttpVerb::Put, "/tasks/complete")?;

        // Admin eligibility is decided from the first group only
        if claims.first_group() == Some(self.config.admin_group.as_str()) {
            grant_admin_rules(&mut policy)?;
        }

        let mut response = policy.build(principal_id)?;
        response.context = Some(IdentityContext { email: claims.email });

        tracing::debug!(
            principal = %response.principal_id,
            statements = response.policy_document.statement.len(),
            "authorization granted"
        );

        Ok(response)
    }
}

/// User management and full task collection access.
fn grant_admin_rules(policy: &mut PolicyBuilder) -> Result<(), AuthError> {
    policy.allow(HttpVerb::Get, "/users")?;
    policy.allow(HttpVerb::Get, "/users/*")?;
    policy.allow(HttpVerb::Post, "/users/*")?;

    policy.allow(HttpVerb::Post, "/tasks")?;
    policy.allow(HttpVerb::Get, "/tasks")?;
    policy.allow(HttpVerb::Get, "/tasks/*")?;
    policy.allow(HttpVerb::Put, "/tasks/*")?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    const METHOD_ARN: &str =
        "arn:aws:execute-api:us-east-1:123456789012:a1b2c3d4e5/prod/GET/users/42";

    #[test]
    fn test_method_arn_parse() {
        let arn: MethodArn = METHOD_ARN.parse().expect("parse");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.account_id, "123456789012");
        assert_eq!(arn.api_id, "a1b2c3d4e5");
        assert_eq!(arn.stage, "prod");
    }

    #[test]
    fn test_method_arn_api_scope() {
        let arn: MethodArn = METHOD_ARN.parse().expect("parse");
        let scope = arn.api_scope();
        assert_eq!(scope.region, "us-east-1");
        assert_eq!(scope.account_id, "123456789012");
        assert_eq!(scope.api_id, "a1b2c3d4e5");
        assert_eq!(scope.stage, "prod");
    }

    #[rstest]
    #[case::not_an_arn("not an arn")]
    #[case::too_few_segments("arn:aws:execute-api:us-east-1:123456789012")]
    #[case::missing_stage("arn:aws:execute-api:us-east-1:123456789012:apionly")]
    #[case::empty_region("arn:aws:execute-api::123456789012:a1b2c3d4e5/prod/GET/users")]
    #[case::empty_stage("arn:aws:execute-api:us-east-1:123456789012:a1b2c3d4e5//GET/users")]
    #[case::empty("")]
    fn test_method_arn_malformed(#[case] input: &str) {
        let result: Result<MethodArn, _> = input.parse();
        assert!(matches!(result, Err(AuthError::BadAddressing(_))), "input: {input}");
    }
}
