// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token authentication and issuance.
//!
//! `authenticate` runs, in order: header shape, unverified decode, kid
//! extraction, key resolution, the `authenticate` policy rule, and (when a
//! user lookup is configured) the account-enabled check. The first failure
//! ends the attempt.

use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use super::claims::{decode_unverified, Claims};
use super::error::AuthError;
use super::keys::KeyLookup;
use super::policy::{AuthenticationInput, Namespace, PolicyEngine, PolicyInput, RULE_AUTHENTICATE};
use crate::storage::UserLookup;

/// Scheme expected in the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Algorithm used for issued tokens.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

#[derive(Clone)]
pub struct Authenticator {
    keys: Arc<dyn KeyLookup>,
    engine: Arc<PolicyEngine>,
    issuer: String,
    users: Option<Arc<dyn UserLookup>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("issuer", &self.issuer)
            .field("user_check", &self.users.is_some())
            .finish()
    }
}

impl Authenticator {
    pub fn new(keys: Arc<dyn KeyLookup>, engine: Arc<PolicyEngine>, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            engine,
            issuer: issuer.into(),
            users: None,
        }
    }

    /// Reject tokens whose subject is unknown or disabled.
    pub fn with_user_check(mut self, users: Arc<dyn UserLookup>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate an `Authorization` header value and return its claims.
    pub async fn authenticate(&self, credential: &str) -> Result<Claims, AuthError> {
        let parts: Vec<&str> = credential.split(' ').collect();
        let token = match parts.as_slice() {
            [scheme, token] if *scheme == BEARER_SCHEME => *token,
            _ => return Err(AuthError::InvalidAuthHeader),
        };

        let unverified = decode_unverified(token).map_err(AuthError::MalformedToken)?;
        let kid = unverified.key_id().map_err(AuthError::MalformedToken)?;

        let key = self
            .keys
            .public_key(kid)
            .await
            .map_err(AuthError::KeyLookup)?;

        let input = PolicyInput::Authentication(AuthenticationInput {
            key,
            token: token.to_string(),
            issuer: self.issuer.clone(),
        });
        self.engine
            .evaluate(Namespace::Authentication, RULE_AUTHENTICATE, &input)
            .map_err(AuthError::PolicyRejected)?;

        let claims = unverified.into_claims();

        if let Some(users) = &self.users {
            let id = claims.subject_id().map_err(AuthError::InvalidSubject)?;
            let user = users.query_by_id(id).await.map_err(AuthError::UserLookup)?;
            if !user.enabled {
                return Err(AuthError::UserDisabled(id));
            }
        }

        Ok(claims)
    }

    /// Sign `claims` with the private key registered under `kid`.
    pub async fn generate_token(&self, kid: &str, claims: &Claims) -> Result<String, AuthError> {
        let pem = self
            .keys
            .private_key(kid)
            .await
            .map_err(AuthError::KeyLookup)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(kid.to_string());

        encode(&header, claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
    }
}
