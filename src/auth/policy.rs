// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Policy Evaluator
//!
//! Rules are pure predicates over a structured [`PolicyInput`], registered in
//! a static, versioned table ([`STANDARD_RULES`]). The engine indexes the
//! table once at startup; callers either evaluate by name or [`prepare`] a
//! rule into a direct reference.
//!
//! ## Fail-closed
//!
//! An unknown rule, a rule that errors, or a rule that returns `false` all
//! produce [`PolicyError`]. Only a rule that deterministically returns `true`
//! for the given input allows.
//!
//! [`prepare`]: PolicyEngine::prepare

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::claims::Claims;
use super::roles::Role;

/// Rule verifying a token's signature, issuer and expiry.
pub const RULE_AUTHENTICATE: &str = "authenticate";
/// Any known role.
pub const RULE_ANY: &str = "rule_any";
/// Admin role only.
pub const RULE_ADMIN_ONLY: &str = "rule_admin_only";
/// User role only.
pub const RULE_USER_ONLY: &str = "rule_user_only";
/// Admin role, or a user acting on its own id.
pub const RULE_ADMIN_OR_SUBJECT: &str = "rule_admin_or_subject";

/// Algorithms the authentication rule accepts.
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

/// Clock skew tolerance for `exp`/`nbf` (60 seconds).
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Rule namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Authentication,
    Authorization,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Authentication => f.write_str("authentication"),
            Namespace::Authorization => f.write_str("authorization"),
        }
    }
}

/// Input for the authentication namespace.
#[derive(Debug, Clone)]
pub struct AuthenticationInput {
    /// PEM encoded verification key
    pub key: String,
    /// Compact token, without the `Bearer ` prefix
    pub token: String,
    /// Expected issuer
    pub issuer: String,
}

/// Input for the authorization namespace.
///
/// Built fresh for every check and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Caller roles
    pub roles: BTreeSet<String>,
    /// Caller subject (claims `sub`)
    pub subject: String,
    /// Target user id; nil when the request names no resource
    pub user_id: Uuid,
    /// Rule to evaluate
    pub rule: String,
}

impl AuthorizationRequest {
    pub fn new(claims: &Claims, user_id: Uuid, rule: impl Into<String>) -> Self {
        Self {
            roles: claims.roles.clone(),
            subject: claims.sub.clone(),
            user_id,
            rule: rule.into(),
        }
    }

    fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role.as_str())
    }
}

/// Structured document a rule is evaluated against.
#[derive(Debug, Clone)]
pub enum PolicyInput {
    Authentication(AuthenticationInput),
    Authorization(AuthorizationRequest),
}

/// A rule predicate. `Err` carries the reason a rule could not decide.
pub type Predicate = fn(&PolicyInput) -> Result<bool, String>;

/// One entry of a rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub namespace: Namespace,
    pub name: &'static str,
    pub version: u32,
    pub predicate: Predicate,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// The rules this service ships with.
pub static STANDARD_RULES: &[Rule] = &[
    Rule {
        namespace: Namespace::Authentication,
        name: RULE_AUTHENTICATE,
        version: 1,
        predicate: authenticate,
    },
    Rule {
        namespace: Namespace::Authorization,
        name: RULE_ANY,
        version: 1,
        predicate: rule_any,
    },
    Rule {
        namespace: Namespace::Authorization,
        name: RULE_ADMIN_ONLY,
        version: 1,
        predicate: rule_admin_only,
    },
    Rule {
        namespace: Namespace::Authorization,
        name: RULE_USER_ONLY,
        version: 1,
        predicate: rule_user_only,
    },
    Rule {
        namespace: Namespace::Authorization,
        name: RULE_ADMIN_OR_SUBJECT,
        version: 1,
        predicate: rule_admin_or_subject,
    },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown rule {namespace}/{rule}")]
    UnknownRule { namespace: Namespace, rule: String },
    #[error("rule {rule} denied")]
    Denied { rule: &'static str },
    #[error("rule {rule} failed: {reason}")]
    Evaluation { rule: &'static str, reason: String },
}

/// A rule resolved once, evaluated many times.
#[derive(Debug, Clone, Copy)]
pub struct PreparedRule(&'static Rule);

impl PreparedRule {
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn version(&self) -> u32 {
        self.0.version
    }

    pub fn evaluate(&self, input: &PolicyInput) -> Result<(), PolicyError> {
        tracing::trace!(rule = self.name(), version = self.version(), "evaluating rule");
        match (self.0.predicate)(input) {
            Ok(true) => Ok(()),
            Ok(false) => Err(PolicyError::Denied { rule: self.0.name }),
            Err(reason) => Err(PolicyError::Evaluation {
                rule: self.0.name,
                reason,
            }),
        }
    }
}

/// Generic evaluator over an immutable rule table.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: HashMap<Namespace, HashMap<&'static str, &'static Rule>>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(STANDARD_RULES)
    }
}

impl PolicyEngine {
    /// Index a rule table. Later entries with the same name replace earlier ones.
    pub fn new(table: &'static [Rule]) -> Self {
        let mut rules: HashMap<Namespace, HashMap<&'static str, &'static Rule>> = HashMap::new();
        for rule in table {
            rules.entry(rule.namespace).or_default().insert(rule.name, rule);
        }
        Self { rules }
    }

    /// Resolve a rule name into a direct reference.
    pub fn prepare(&self, namespace: Namespace, rule: &str) -> Result<PreparedRule, PolicyError> {
        self.rules
            .get(&namespace)
            .and_then(|rules| rules.get(rule))
            .map(|rule| PreparedRule(*rule))
            .ok_or_else(|| PolicyError::UnknownRule {
                namespace,
                rule: rule.to_string(),
            })
    }

    /// Evaluate `rule` against `input`. `Ok(())` means allow.
    pub fn evaluate(
        &self,
        namespace: Namespace,
        rule: &str,
        input: &PolicyInput,
    ) -> Result<(), PolicyError> {
        self.prepare(namespace, rule)?.evaluate(input)
    }

    pub fn rule_names(&self, namespace: Namespace) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .rules
            .get(&namespace)
            .map(|rules| rules.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}

// =============================================================================
// Rules
// =============================================================================

fn authenticate(input: &PolicyInput) -> Result<bool, String> {
    let PolicyInput::Authentication(input) = input else {
        return Ok(false);
    };

    let header = jsonwebtoken::decode_header(&input.token).map_err(|e| e.to_string())?;
    if !ALLOWED_ALGORITHMS.contains(&header.alg) {
        return Ok(false);
    }

    let key = DecodingKey::from_rsa_pem(input.key.as_bytes()).map_err(|e| e.to_string())?;

    let mut validation = Validation::new(header.alg);
    validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
    validation.set_issuer(&[input.issuer.as_str()]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_aud = false;
    validation.leeway = CLOCK_SKEW_LEEWAY;

    Ok(jsonwebtoken::decode::<Claims>(&input.token, &key, &validation).is_ok())
}

fn authorization(input: &PolicyInput) -> Option<&AuthorizationRequest> {
    match input {
        PolicyInput::Authorization(request) => Some(request),
        PolicyInput::Authentication(_) => None,
    }
}

fn rule_any(input: &PolicyInput) -> Result<bool, String> {
    Ok(authorization(input).is_some_and(|r| r.has_role(Role::Admin) || r.has_role(Role::User)))
}

fn rule_admin_only(input: &PolicyInput) -> Result<bool, String> {
    Ok(authorization(input).is_some_and(|r| r.has_role(Role::Admin)))
}

fn rule_user_only(input: &PolicyInput) -> Result<bool, String> {
    Ok(authorization(input).is_some_and(|r| r.has_role(Role::User)))
}

fn rule_admin_or_subject(input: &PolicyInput) -> Result<bool, String> {
    let Some(request) = authorization(input) else {
        return Ok(false);
    };

    if request.has_role(Role::Admin) {
        return Ok(true);
    }

    // The nil id stands for "no target" and must never match a subject.
    Ok(request.has_role(Role::User)
        && !request.user_id.is_nil()
        && request.subject == request.user_id.to_string())
}
