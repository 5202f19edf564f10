// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Product endpoints.

use crate::pipeline::{HandlerResult, Reply, RequestContext};
use crate::storage::Product;

/// The product resolved by product authorization.
#[utoipa::path(
    get,
    path = "/v1/products/{product_id}",
    tag = "Products",
    security(("bearer" = [])),
    params(("product_id" = uuid::Uuid, Path, description = "Target product")),
    responses(
        (status = 200, description = "The product", body = Product),
        (status = 401, description = "Not the owner or an admin, or no such product"),
        (status = 500, description = "Product store unavailable"),
    )
)]
pub async fn query_by_id(ctx: RequestContext) -> HandlerResult {
    Reply::ok(ctx.product()?)
}
