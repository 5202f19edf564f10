// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Middleware Pipeline
//!
//! A [`Handler`] turns a [`RequestContext`] into a [`Reply`] or an
//! [`AppError`]. A [`Middleware`] wraps one handler into another. A [`Chain`]
//! nests middlewares around a terminal handler in a fixed order, decided once
//! at startup:
//!
//! ```text
//! Logger -> Errors -> Metrics -> Panics -> Authenticate -> Authorize.. -> handler
//! ```
//!
//! The first four are global and wrap every route. Authentication and
//! authorization are per route. Any middleware may return without calling
//! the handler it wraps; errors and replies flow back out through every
//! middleware that already ran.

pub mod authenticate;
pub mod authorize;
pub mod context;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod panics;

use std::future::Future;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

pub use authenticate::authenticate;
pub use authorize::{authorize, authorize_product, authorize_user};
pub use context::{ContextError, Interrupted, RequestContext};
pub use errors::errors;
pub use logger::logger;
pub use metrics::metrics;
pub use panics::panics;

pub type HandlerResult = Result<Reply, AppError>;

pub type Handler = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Box an async function into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Box a handler transformer into a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Successful handler outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json { status: StatusCode, body: Value },
    NoContent,
}

impl Reply {
    /// `200 OK` with `value` as the JSON body.
    pub fn ok<T: Serialize>(value: T) -> Result<Self, AppError> {
        Self::json(StatusCode::OK, value)
    }

    pub fn json<T: Serialize>(status: StatusCode, value: T) -> Result<Self, AppError> {
        Ok(Reply::Json {
            status,
            body: serde_json::to_value(value)?,
        })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Json { status, .. } => *status,
            Reply::NoContent => StatusCode::NO_CONTENT,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json { status, body } => (status, Json(body)).into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Nest `layers` around `handler`; the first layer ends up outermost.
pub fn wrap(layers: &[Middleware], handler: Handler) -> Handler {
    layers.iter().rev().fold(handler, |inner, layer| layer(inner))
}

/// Global middlewares plus per-route composition.
#[derive(Clone, Default)]
pub struct Chain {
    global: Vec<Middleware>,
}

impl Chain {
    pub fn new(global: Vec<Middleware>) -> Self {
        Self { global }
    }

    /// Build a route handler: global middlewares outside, `route` inside.
    pub fn route(&self, route: &[Middleware], handler: Handler) -> Handler {
        wrap(&self.global, wrap(route, handler))
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("global", &self.global.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use std::sync::Mutex;

    fn tracing_layer(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware {
        middleware(move |next| {
            let log = log.clone();
            handler(move |ctx| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("enter {name}"));
                    let result = next(ctx).await;
                    log.lock().unwrap().push(format!("leave {name}"));
                    result
                }
            })
        })
    }

    fn short_circuit() -> Middleware {
        middleware(|_next| handler(|_ctx| async { Err(AppError::unauthenticated("stop")) }))
    }

    #[tokio::test]
    async fn first_layer_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(vec![
            tracing_layer("a", log.clone()),
            tracing_layer("b", log.clone()),
        ]);
        let inner_log = log.clone();
        let route = chain.route(
            &[tracing_layer("c", log.clone())],
            handler(move |_ctx| {
                let log = inner_log.clone();
                async move {
                    log.lock().unwrap().push("handler".to_string());
                    Ok(Reply::NoContent)
                }
            }),
        );

        let reply = route(RequestContext::new(Method::GET, "/")).await.unwrap();
        assert_eq!(reply, Reply::NoContent);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter a", "enter b", "enter c", "handler", "leave c", "leave b", "leave a"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(vec![tracing_layer("outer", log.clone())]);
        let route = chain.route(
            &[short_circuit(), tracing_layer("inner", log.clone())],
            handler(|_ctx| async { Ok(Reply::NoContent) }),
        );

        let err = route(RequestContext::new(Method::GET, "/")).await.unwrap_err();
        assert_eq!(err.message(), "stop");
        assert_eq!(*log.lock().unwrap(), vec!["enter outer", "leave outer"]);
    }

    #[test]
    fn reply_statuses() {
        assert_eq!(Reply::NoContent.status(), StatusCode::NO_CONTENT);
        let reply = Reply::json(StatusCode::CREATED, serde_json::json!({"id": 1})).unwrap();
        assert_eq!(reply.status(), StatusCode::CREATED);
    }

    #[test]
    fn no_content_has_empty_body() {
        let response = Reply::NoContent.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
