// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pipeline::{handler, Handler, HandlerResult, Reply, RequestContext};

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness check endpoint handler.
///
/// Returns 200 as long as the process is serving requests.
#[utoipa::path(
    get,
    path = "/v1/liveness",
    tag = "System",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness(_ctx: RequestContext) -> HandlerResult {
    Reply::ok(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Current request metrics.
#[utoipa::path(
    get,
    path = "/v1/admin/metrics",
    tag = "System",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Counter snapshot", body = MetricsSnapshot),
        (status = 401, description = "Caller is not an admin"),
    )
)]
pub fn metrics(registry: Arc<Metrics>) -> Handler {
    handler(move |_ctx| {
        let snapshot = registry.snapshot();
        async move { Reply::ok(snapshot) }
    })
}
