// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error translation.
//!
//! This is the only place a failed request is logged. Server-fault kinds are
//! logged once with their capture site and detail; client-fault kinds pass
//! silently. The error is then rewritten into its public form.

use super::{handler, middleware, Middleware};

pub fn errors() -> Middleware {
    middleware(|next| {
        handler(move |ctx| {
            let next = next.clone();
            async move {
                let request_id = ctx.request_id().to_string();

                let err = match next(ctx).await {
                    Ok(reply) => return Ok(reply),
                    Err(err) => err,
                };

                if err.kind().is_server_fault() {
                    tracing::error!(
                        %request_id,
                        source_err_file = err.site_file(),
                        source_err_site = %err.site(),
                        kind = %err.kind(),
                        detail = err.detail().unwrap_or_default(),
                        "{}",
                        err.message()
                    );
                }

                Err(err.into_public())
            }
        })
    })
}
