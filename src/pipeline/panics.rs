// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Panic containment.
//!
//! A panic anywhere inside the wrapped handler is caught at this boundary and
//! turned into an `Internal` error carrying the panic message and a stack
//! trace. The trace is captured by a process-wide panic hook (installed on
//! first use, chained to any existing hook) into a thread-local slot that is
//! read back on the thread that caught the unwind.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use futures::FutureExt;

use super::{handler, middleware, Middleware};
use crate::error::{AppError, INTERNAL_MESSAGE};
use crate::metrics::Metrics;

thread_local! {
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_trace_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

pub fn panics(registry: Arc<Metrics>) -> Middleware {
    install_trace_hook();

    middleware(move |next| {
        let registry = registry.clone();
        handler(move |ctx| {
            let next = next.clone();
            let registry = registry.clone();
            async move {
                // The handler call itself sits inside the guarded future so
                // that a panic before its first await is caught too.
                let guarded = AssertUnwindSafe(async move { next(ctx).await });
                match guarded.catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        registry.record_panic();
                        let trace = LAST_TRACE
                            .with(|slot| slot.borrow_mut().take())
                            .unwrap_or_default();
                        Err(AppError::internal(INTERNAL_MESSAGE).with_detail(format!(
                            "PANIC [{}] TRACE [{}]",
                            panic_message(payload.as_ref()),
                            trace
                        )))
                    }
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::{Handler, HandlerResult, Reply, RequestContext};
    use axum::http::Method;
    use futures::future::BoxFuture;

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let registry = Arc::new(Metrics::default());
        let boom = panics(registry.clone())(handler(|ctx| async move {
            if ctx.path() == "/boom" {
                panic!("handler exploded");
            }
            Ok(Reply::NoContent)
        }));

        for _ in 0..25 {
            let err = boom(RequestContext::new(Method::GET, "/boom")).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Internal);
            assert_eq!(err.message(), INTERNAL_MESSAGE);
            assert!(err.detail().unwrap().contains("handler exploded"));
        }
        assert_eq!(registry.snapshot().panics, 25);

        let reply = boom(RequestContext::new(Method::GET, "/fine")).await.unwrap();
        assert_eq!(reply, Reply::NoContent);
        assert_eq!(registry.snapshot().panics, 25);
    }

    #[tokio::test]
    async fn synchronous_panics_are_caught() {
        let registry = Arc::new(Metrics::default());
        let eager: Handler = Arc::new(
            |_ctx: RequestContext| -> BoxFuture<'static, HandlerResult> { panic!("before the future") },
        );

        let err = panics(registry.clone())(eager)(RequestContext::new(Method::GET, "/"))
            .await
            .unwrap_err();
        assert!(err.detail().unwrap().contains("before the future"));
        assert_eq!(registry.snapshot().panics, 1);
    }

    #[test]
    fn formatted_payloads_are_read() {
        let payload: Box<dyn Any + Send> = Box::new(format!("index {} out of range", 3));
        assert_eq!(panic_message(payload.as_ref()), "index 3 out of range");
    }
}
