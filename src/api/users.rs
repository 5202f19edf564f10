// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::pipeline::{HandlerResult, Reply, RequestContext};
use crate::storage::User;

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Caller id (token subject)
    pub user_id: Uuid,
    /// Token issuer
    pub issuer: String,
    pub roles: BTreeSet<String>,
    /// Token expiry (Unix seconds)
    pub expires_at: i64,
}

/// Identity and roles of the authenticated caller.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller identity", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.claims()?;
    Reply::ok(UserMeResponse {
        user_id: ctx.user_id()?,
        issuer: claims.iss.clone(),
        roles: claims.roles.clone(),
        expires_at: claims.exp,
    })
}

/// The user resolved by user authorization.
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = Uuid, Path, description = "Target user")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 401, description = "Not the user or an admin, or no such user"),
    )
)]
pub async fn query_by_id(ctx: RequestContext) -> HandlerResult {
    Reply::ok(ctx.user()?)
}
