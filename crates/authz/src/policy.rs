//! Policy compilation: grants, statements, the policy builder.
//!
//! [`PolicyBuilder`] accumulates the grants selected for one authorization
//! decision and compiles them into the policy document the front-door
//! enforcement point applies. The builder is a single-owner value scoped to
//! one request: grants are appended through `&mut self` and the document is
//! produced by consuming `build`.
//!
//! # Statement shape
//!
//! A statement can carry at most one condition block, so compilation splits
//! grants per effect: unconditioned grants of the same effect merge into one
//! statement (keeping the document compact), while each conditioned grant
//! becomes its own statement so its condition applies only to its own
//! resource.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Policy language version understood by the enforcement point.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The single action every statement grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// HTTP verbs recognized by the gateway, plus the wildcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// Any verb (`*`).
    All,
}

impl HttpVerb {
    /// Returns the verb as it appears in a resource identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::All => "*",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "HEAD" => Ok(HttpVerb::Head),
            "DELETE" => Ok(HttpVerb::Delete),
            "OPTIONS" => Ok(HttpVerb::Options),
            "*" => Ok(HttpVerb::All),
            other => Err(AuthError::invalid_verb(other)),
        }
    }
}

/// Effect of a grant or statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Permit the matched resources.
    Allow,
    /// Forbid the matched resources.
    Deny,
}

/// A structured condition predicate attached to a single statement.
pub type Condition = Map<String, Value>;

/// One permission unit fed into policy compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodGrant {
    /// Whether the grant permits or forbids.
    pub effect: Effect,
    /// The HTTP verb the grant covers.
    pub verb: HttpVerb,
    /// The resource path, with the leading `/` already stripped.
    pub resource_path: String,
    /// The fully-qualified resource identifier derived at append time.
    pub resource_arn: String,
    /// Optional condition; a conditioned grant compiles to its own statement.
    pub condition: Option<Condition>,
}

/// The API addressing a policy's resource identifiers are derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiScope {
    /// Deployment region.
    pub region: String,
    /// Account that owns the API.
    pub account_id: String,
    /// API identifier.
    pub api_id: String,
    /// Deployment stage.
    pub stage: String,
}

impl ApiScope {
    /// Derives the fully-qualified resource identifier for a verb and a
    /// cleaned (no leading `/`) resource path.
    #[must_use]
    pub fn resource_arn(&self, verb: HttpVerb, cleaned_path: &str) -> String {
        format!(
            "arn:aws:execute-api:{}:{}:{}/{}/{}/{}",
            self.region, self.account_id, self.api_id, self.stage, verb, cleaned_path
        )
    }
}

/// One compiled unit of the output policy document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The action covered; always [`INVOKE_ACTION`].
    #[serde(rename = "Action")]
    pub action: String,

    /// Whether the statement permits or forbids.
    #[serde(rename = "Effect")]
    pub effect: Effect,

    /// The fully-qualified resource identifiers covered, in grant order.
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,

    /// At most one condition block, present only on split-out statements.
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Statement {
    fn empty(effect: Effect) -> Self {
        Self { action: INVOKE_ACTION.to_string(), effect, resource: Vec::new(), condition: None }
    }
}

/// The compiled policy document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy language version; always [`POLICY_VERSION`].
    #[serde(rename = "Version")]
    pub version: String,

    /// Ordered statements: Allow statements first, then Deny.
    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

/// Identity attributes forwarded to downstream operations alongside the
/// policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityContext {
    /// The caller's verified email attribute, when present in the claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The authorization decision handed back to the enforcement point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizerResponse {
    /// The authenticated caller's unique identifier.
    #[serde(rename = "principalId")]
    pub principal_id: String,

    /// The compiled policy document.
    #[serde(rename = "policyDocument")]
    pub policy_document: PolicyDocument,

    /// Identity context attached by the orchestrator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<IdentityContext>,
}

/// Accumulates grants for one authorization decision and compiles them.
///
/// # Examples
///
/// ```
/// use tasklane_authz::policy::{ApiScope, HttpVerb, PolicyBuilder};
///
/// let scope = ApiScope {
///     region: "us-east-1".into(),
///     account_id: "123456789012".into(),
///     api_id: "a1b2c3d4e5".into(),
///     stage: "prod".into(),
/// };
///
/// let mut builder = PolicyBuilder::new(scope);
/// builder.allow(HttpVerb::Get, "/tasks/myTasks")?;
/// builder.allow(HttpVerb::Put, "/tasks/complete")?;
///
/// let response = builder.build("user-42")?;
/// assert_eq!(response.policy_document.statement.len(), 1);
/// # Ok::<(), tasklane_authz::error::AuthError>(())
/// ```
#[derive(Debug)]
pub struct PolicyBuilder {
    scope: ApiScope,
    allow: Vec<MethodGrant>,
    deny: Vec<MethodGrant>,
}

impl PolicyBuilder {
    /// Creates a builder deriving resource identifiers from `scope`.
    #[must_use]
    pub fn new(scope: ApiScope) -> Self {
        Self { scope, allow: Vec::new(), deny: Vec::new() }
    }

    /// Records an unconditioned Allow grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResourcePath`] without recording anything
    /// if the path is empty or contains characters outside
    /// `[A-Za-z0-9./-*]`.
    pub fn allow(&mut self, verb: HttpVerb, resource_path: &str) -> Result<(), AuthError> {
        self.add(Effect::Allow, verb, resource_path, None)
    }

    /// Records an Allow grant carrying a condition.
    ///
    /// # Errors
    ///
    /// As [`allow`](Self::allow).
    pub fn allow_with_condition(
        &mut self,
        verb: HttpVerb,
        resource_path: &str,
        condition: Condition,
    ) -> Result<(), AuthError> {
        self.add(Effect::Allow, verb, resource_path, Some(condition))
    }

    /// Records an unconditioned Deny grant.
    ///
    /// # Errors
    ///
    /// As [`allow`](Self::allow).
    pub fn deny(&mut self, verb: HttpVerb, resource_path: &str) -> Result<(), AuthError> {
        self.add(Effect::Deny, verb, resource_path, None)
    }

    /// Records a Deny grant carrying a condition.
    ///
    /// # Errors
    ///
    /// As [`allow`](Self::allow).
    pub fn deny_with_condition(
        &mut self,
        verb: HttpVerb,
        resource_path: &str,
        condition: Condition,
    ) -> Result<(), AuthError> {
        self.add(Effect::Deny, verb, resource_path, Some(condition))
    }

    /// Records an Allow grant covering every verb and resource.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible for signature symmetry.
    pub fn allow_all(&mut self) -> Result<(), AuthError> {
        self.add(Effect::Allow, HttpVerb::All, "*", None)
    }

    /// Records a Deny grant covering every verb and resource.
    ///
    /// # Errors
    ///
    /// Infallible in practice; kept fallible for signature symmetry.
    pub fn deny_all(&mut self) -> Result<(), AuthError> {
        self.add(Effect::Deny, HttpVerb::All, "*", None)
    }

    fn add(
        &mut self,
        effect: Effect,
        verb: HttpVerb,
        resource_path: &str,
        condition: Option<Condition>,
    ) -> Result<(), AuthError> {
        validate_resource_path(resource_path)?;

        let cleaned = resource_path.strip_prefix('/').unwrap_or(resource_path);
        let resource_arn = self.scope.resource_arn(verb, cleaned);

        let grant = MethodGrant {
            effect,
            verb,
            resource_path: cleaned.to_string(),
            resource_arn,
            condition,
        };

        match effect {
            Effect::Allow => self.allow.push(grant),
            Effect::Deny => self.deny.push(grant),
        }

        Ok(())
    }

    /// Compiles the recorded grants into a policy for `principal_id`.
    ///
    /// Allow statements come first, then Deny. Within an effect, the merged
    /// unconditioned statement (if any) precedes the conditioned statements,
    /// which keep grant-insertion order. Resource lists preserve duplicates,
    /// so the output is a pure function of input order.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptyPolicy`] if no grants were recorded.
    pub fn build(self, principal_id: impl Into<String>) -> Result<AuthorizerResponse, AuthError> {
        if self.allow.is_empty() && self.deny.is_empty() {
            return Err(AuthError::EmptyPolicy);
        }

        let mut statements = Vec::new();
        statements_for_effect(Effect::Allow, &self.allow, &mut statements);
        statements_for_effect(Effect::Deny, &self.deny, &mut statements);

        Ok(AuthorizerResponse {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: statements,
            },
            context: None,
        })
    }
}

/// Compiles one effect's grants into statements.
///
/// An empty condition map counts as unconditioned.
fn statements_for_effect(effect: Effect, grants: &[MethodGrant], out: &mut Vec<Statement>) {
    if grants.is_empty() {
        return;
    }

    let mut merged = Statement::empty(effect);
    let mut conditioned = Vec::new();

    for grant in grants {
        match &grant.condition {
            Some(condition) if !condition.is_empty() => {
                let mut statement = Statement::empty(effect);
                statement.resource.push(grant.resource_arn.clone());
                statement.condition = Some(condition.clone());
                conditioned.push(statement);
            }
            _ => merged.resource.push(grant.resource_arn.clone()),
        }
    }

    if !merged.resource.is_empty() {
        out.push(merged);
    }
    out.append(&mut conditioned);
}

fn validate_resource_path(path: &str) -> Result<(), AuthError> {
    let valid = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/' | '*'));

    if valid {
        Ok(())
    } else {
        Err(AuthError::invalid_resource_path(path))
    }
}
