// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization as a service, and token issuance.
//!
//! `authorize` lets another service ask whether a set of claims passes a rule
//! against a target user, without holding keys or rules itself. `token`
//! signs a token for an existing account with the active key.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Authenticator, Authorizer, Claims, Role};
use crate::error::{AppError, INTERNAL_MESSAGE};
use crate::pipeline::{handler, Handler, Reply};
use crate::storage::{LookupError, UserLookup};

/// Lifetime of issued tokens.
pub const TOKEN_TTL_HOURS: i64 = 8;

/// Body of POST /v1/auth/authorize
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeRequest {
    pub claims: Claims,
    #[serde(alias = "userID")]
    pub user_id: Uuid,
    pub rule: String,
}

/// Body of POST /v1/auth/token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Account the token is issued for
    #[serde(alias = "userID")]
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    /// Key id stamped into the token header
    pub kid: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Evaluate the posted request. 204 on allow.
#[utoipa::path(
    post,
    path = "/v1/auth/authorize",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = AuthorizeRequest,
    responses(
        (status = 204, description = "The claims pass the rule"),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Denied, or caller is not an admin"),
    )
)]
pub fn authorize(authorizer: Authorizer) -> Handler {
    handler(move |ctx| {
        let authorizer = authorizer.clone();
        async move {
            let request: AuthorizeRequest = serde_json::from_slice(ctx.body())
                .map_err(|e| AppError::failed_precondition(format!("invalid request body: {e}")))?;

            tracing::debug!(
                request_id = %ctx.request_id(),
                rule = %request.rule,
                user_id = %request.user_id,
                "authorize request"
            );

            authorizer.authorize(&request.claims, request.user_id, &request.rule)?;
            Ok(Reply::NoContent)
        }
    })
}

/// Issue a token for an enabled account, carrying its known roles.
#[utoipa::path(
    post,
    path = "/v1/auth/token",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Signed token", body = TokenResponse),
        (status = 400, description = "Malformed body or disabled account"),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "No such account"),
        (status = 500, description = "No usable signing key"),
    )
)]
pub fn token(
    authenticator: Authenticator,
    users: Arc<dyn UserLookup>,
    active_kid: Option<String>,
) -> Handler {
    handler(move |ctx| {
        let authenticator = authenticator.clone();
        let users = users.clone();
        let active_kid = active_kid.clone();
        async move {
            let Some(kid) = active_kid else {
                return Err(AppError::internal_only_log(
                    "token requested but no active signing key is configured",
                ));
            };

            let request: TokenRequest = serde_json::from_slice(ctx.body())
                .map_err(|e| AppError::failed_precondition(format!("invalid request body: {e}")))?;

            let user = match ctx.bounded(users.query_by_id(request.user_id)).await {
                Ok(Ok(user)) => user,
                Ok(Err(LookupError::NotFound { id, .. })) => {
                    return Err(AppError::not_found(format!("user {id} not found")));
                }
                Ok(Err(err)) => {
                    return Err(AppError::internal(INTERNAL_MESSAGE).with_detail(err.to_string()));
                }
                Err(why) => {
                    return Err(AppError::internal(INTERNAL_MESSAGE).with_detail(format!("{why:?}")));
                }
            };
            if !user.enabled {
                return Err(AppError::failed_precondition(format!("user {} is disabled", user.id)));
            }

            // Unknown role names never make it into a signed token.
            let roles = user
                .roles
                .iter()
                .filter(|role| Role::parse(role).is_some())
                .map(String::as_str);
            let claims = Claims::new(
                user.id,
                authenticator.issuer(),
                roles,
                Duration::hours(TOKEN_TTL_HOURS),
            );

            let token = authenticator
                .generate_token(&kid, &claims)
                .await
                .map_err(|e| AppError::internal(INTERNAL_MESSAGE).with_detail(e.to_string()))?;

            tracing::info!(
                request_id = %ctx.request_id(),
                user_id = %user.id,
                %kid,
                "token issued"
            );

            Reply::ok(TokenResponse {
                token,
                kid,
                expires_at: claims.expires_at(),
            })
        }
    })
}
