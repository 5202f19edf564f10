// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request start/completion logging.

use tokio::time::Instant;

use super::{handler, middleware, Middleware};

/// Outermost middleware: logs every request and the status it left with.
pub fn logger() -> Middleware {
    middleware(|next| {
        handler(move |ctx| {
            let next = next.clone();
            async move {
                let started = Instant::now();
                let request_id = ctx.request_id().to_string();
                let method = ctx.method().clone();
                let path = ctx.path().to_string();

                tracing::info!(%request_id, %method, %path, "request started");

                let result = next(ctx).await;
                let status = match &result {
                    Ok(reply) => reply.status(),
                    Err(err) => err.status_code(),
                };

                tracing::info!(
                    %request_id,
                    %method,
                    %path,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
                result
            }
        })
    })
}
