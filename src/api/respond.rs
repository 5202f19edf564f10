// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bridge between axum and the middleware pipeline.
//!
//! Each request runs its chain on its own task. If the client goes away the
//! axum future is dropped, the drop guard cancels the request token, and the
//! chain stops at its next bounded wait without a response being written.
//! Logging and metrics recorded up to that point stand.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header::AUTHORIZATION, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::pipeline::{Handler, RequestContext};

/// Header carrying the request id, set by the request id layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build a request context from the HTTP request parts.
pub fn request_context(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
    timeout: Duration,
) -> RequestContext {
    let mut ctx = RequestContext::new(method, uri.path())
        .with_params(params)
        .with_body(body)
        .with_deadline(Instant::now() + timeout);

    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_request_id(id);
    }
    if let Some(credential) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_authorization(credential);
    }
    ctx
}

/// Run `handler` for `ctx` and turn the outcome into a response.
pub async fn dispatch(handler: Handler, ctx: RequestContext) -> Response {
    let cancel = CancellationToken::new();
    let disconnect = cancel.clone().drop_guard();
    let ctx = ctx.with_cancellation(cancel);

    let outcome = match tokio::spawn(handler(ctx)).await {
        Ok(outcome) => outcome,
        Err(join) => Err(AppError::untagged(&join)),
    };
    let _ = disconnect.disarm();

    match outcome {
        Ok(reply) => reply.into_response(),
        Err(err) => err.into_response(),
    }
}
