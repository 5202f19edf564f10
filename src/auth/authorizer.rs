// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rule based authorization.
//!
//! Three call shapes share one rule evaluation:
//!
//! - [`Authorizer::authorize`]: claims and rule only, target is the nil id
//! - [`Authorizer::authorize_user`]: target is a user named in the path
//! - [`Authorizer::authorize_product`]: target is the owner of a product
//!   named in the path
//!
//! Resource shapes return the loaded resource so the caller can keep it for
//! the handler.

use std::sync::Arc;

use uuid::Uuid;

use super::claims::Claims;
use super::error::AuthzError;
use super::policy::{AuthorizationRequest, Namespace, PolicyEngine, PolicyInput, RULE_ADMIN_OR_SUBJECT};
use crate::storage::{OwnedResource, Product, ProductLookup, User, UserLookup};

#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    engine: Arc<PolicyEngine>,
}

impl Authorizer {
    pub fn new(engine: Arc<PolicyEngine>) -> Self {
        Self { engine }
    }

    /// Evaluate a fully built request.
    pub fn check(&self, request: AuthorizationRequest) -> Result<(), AuthzError> {
        let rule = request.rule.clone();
        let roles = request.roles.clone();
        self.engine
            .evaluate(
                Namespace::Authorization,
                &rule,
                &PolicyInput::Authorization(request),
            )
            .map_err(|source| AuthzError::Denied {
                roles,
                rule,
                source,
            })
    }

    /// Evaluate `rule` for `claims` against `user_id`.
    pub fn authorize(&self, claims: &Claims, user_id: Uuid, rule: &str) -> Result<(), AuthzError> {
        self.check(AuthorizationRequest::new(claims, user_id, rule))
    }

    /// Resolve the user named by `raw_id` and evaluate `rule` against it.
    ///
    /// With no id in the path the nil id is used and no lookup happens.
    pub async fn authorize_user(
        &self,
        users: &dyn UserLookup,
        claims: &Claims,
        raw_id: Option<&str>,
        rule: &str,
    ) -> Result<Option<User>, AuthzError> {
        let Some(raw_id) = raw_id else {
            self.authorize(claims, Uuid::nil(), rule)?;
            return Ok(None);
        };

        let id = parse_id(raw_id)?;
        let user = users.query_by_id(id).await.map_err(AuthzError::UserLookup)?;
        self.authorize(claims, user.owner_user_id(), rule)?;
        Ok(Some(user))
    }

    /// Resolve the product named by `raw_id` and require its owner or an admin.
    pub async fn authorize_product(
        &self,
        products: &dyn ProductLookup,
        claims: &Claims,
        raw_id: Option<&str>,
    ) -> Result<Option<Product>, AuthzError> {
        let Some(raw_id) = raw_id else {
            self.authorize(claims, Uuid::nil(), RULE_ADMIN_OR_SUBJECT)?;
            return Ok(None);
        };

        let id = parse_id(raw_id)?;
        let product = products
            .query_by_id(id)
            .await
            .map_err(AuthzError::ProductLookup)?;
        self.authorize(claims, product.owner_user_id(), RULE_ADMIN_OR_SUBJECT)?;
        Ok(Some(product))
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AuthzError> {
    Uuid::parse_str(raw).map_err(|_| AuthzError::InvalidId(raw.to_string()))
}
