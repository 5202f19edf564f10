// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, Uri},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::policy::{RULE_ADMIN_ONLY, RULE_ADMIN_OR_SUBJECT, RULE_ANY};
use crate::auth::Claims;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{
    authenticate, authorize, authorize_product, authorize_user, handler, Handler,
};
use crate::state::AppState;
use crate::storage::{Product, User};

pub mod auth;
pub mod products;
pub mod respond;
pub mod system;
pub mod users;

use respond::{dispatch, request_context};

pub fn router(state: AppState) -> Router {
    let chain = state.chain();
    let timeout = state.request_timeout;
    let authn = authenticate(state.authenticator.clone());
    let authz = &state.authorizer;

    let liveness = chain.route(&[], handler(system::liveness));
    let me = chain.route(
        &[authn.clone(), authorize(authz.clone(), RULE_ANY)],
        handler(users::me),
    );
    let user = chain.route(
        &[
            authn.clone(),
            authorize_user(authz.clone(), state.users.clone(), RULE_ADMIN_OR_SUBJECT),
        ],
        handler(users::query_by_id),
    );
    let product = chain.route(
        &[
            authn.clone(),
            authorize_product(authz.clone(), state.products.clone()),
        ],
        handler(products::query_by_id),
    );
    let check = chain.route(
        &[authn.clone(), authorize(authz.clone(), RULE_ADMIN_ONLY)],
        auth::authorize(authz.clone()),
    );
    let issue = chain.route(
        &[authn.clone(), authorize(authz.clone(), RULE_ADMIN_ONLY)],
        auth::token(
            state.authenticator.clone(),
            state.users.clone(),
            state.active_kid.clone(),
        ),
    );
    let metrics = chain.route(
        &[authn, authorize(authz.clone(), RULE_ADMIN_ONLY)],
        system::metrics(state.metrics.clone()),
    );

    let v1_routes = Router::new()
        .route("/liveness", endpoint(MethodFilter::GET, liveness, timeout))
        .route("/users/me", endpoint(MethodFilter::GET, me, timeout))
        .route(
            "/users/{user_id}",
            endpoint_with_params(MethodFilter::GET, user, timeout),
        )
        .route(
            "/products/{product_id}",
            endpoint_with_params(MethodFilter::GET, product, timeout),
        )
        .route("/auth/authorize", endpoint(MethodFilter::POST, check, timeout))
        .route("/auth/token", endpoint(MethodFilter::POST, issue, timeout))
        .route("/admin/metrics", endpoint(MethodFilter::GET, metrics, timeout));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        system::liveness,
        system::metrics,
        users::me,
        users::query_by_id,
        products::query_by_id,
        auth::authorize,
        auth::token
    ),
    components(
        schemas(
            system::HealthResponse,
            users::UserMeResponse,
            auth::AuthorizeRequest,
            auth::TokenRequest,
            auth::TokenResponse,
            Claims,
            User,
            Product,
            MetricsSnapshot
        )
    ),
    tags(
        (name = "System", description = "Liveness and request metrics"),
        (name = "Users", description = "Caller identity and user lookup"),
        (name = "Products", description = "Owner-scoped product lookup"),
        (name = "Auth", description = "Rule checks and token issuance")
    )
)]
struct ApiDoc;

fn endpoint(filter: MethodFilter, handler: Handler, timeout: Duration) -> MethodRouter {
    on(
        filter,
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let ctx = request_context(method, &uri, &headers, HashMap::new(), body, timeout);
            dispatch(handler.clone(), ctx)
        },
    )
}

fn endpoint_with_params(filter: MethodFilter, handler: Handler, timeout: Duration) -> MethodRouter {
    on(
        filter,
        move |method: Method,
              uri: Uri,
              headers: HeaderMap,
              Path(params): Path<HashMap<String, String>>,
              body: Bytes| {
            let ctx = request_context(method, &uri, &headers, params, body, timeout);
            dispatch(handler.clone(), ctx)
        },
    )
}
