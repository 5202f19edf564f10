// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request and error counting.

use std::sync::Arc;

use super::{handler, middleware, Middleware};
use crate::metrics::Metrics;

pub fn metrics(registry: Arc<Metrics>) -> Middleware {
    middleware(move |next| {
        let registry = registry.clone();
        handler(move |ctx| {
            let next = next.clone();
            let registry = registry.clone();
            async move {
                let _in_flight = registry.begin_request();
                let result = next(ctx).await;
                if result.is_err() {
                    registry.record_error();
                }
                result
            }
        })
    })
}
