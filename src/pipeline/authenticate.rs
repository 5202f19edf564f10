// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token authentication stage.

use std::sync::Arc;

use super::{handler, middleware, Interrupted, Middleware};
use crate::auth::{AuthError, Authenticator};

/// Authenticate the `Authorization` header and store the claims and caller
/// id in the context. Failures never reach the wrapped handler.
///
/// Runs under the request deadline; running out of time is reported as
/// `Unauthenticated`.
pub fn authenticate(authenticator: Authenticator) -> Middleware {
    let authenticator = Arc::new(authenticator);

    middleware(move |next| {
        let authenticator = authenticator.clone();
        handler(move |ctx| {
            let next = next.clone();
            let authenticator = authenticator.clone();
            async move {
                let outcome = match ctx.bounded(authenticator.authenticate(ctx.authorization())).await {
                    Ok(outcome) => outcome,
                    Err(Interrupted::DeadlineExceeded) => Err(AuthError::Timeout("authentication")),
                    Err(Interrupted::Cancelled) => Err(AuthError::Cancelled),
                };

                let verified = outcome.and_then(|claims| {
                    let subject = claims.subject_id().map_err(AuthError::InvalidSubject)?;
                    Ok((subject, claims))
                });

                let (subject, claims) = match verified {
                    Ok(verified) => verified,
                    Err(err) => {
                        tracing::debug!(
                            request_id = %ctx.request_id(),
                            code = err.error_code(),
                            "authentication rejected"
                        );
                        return Err(err.into());
                    }
                };

                let ctx = ctx.set_user_id(subject)?.set_claims(claims)?;
                next(ctx).await
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::http::Method;
    use tokio::time::Instant;
    use uuid::Uuid;

    use crate::auth::error::UNAUTHENTICATED_MESSAGE;
    use crate::auth::{KeyStore, PolicyEngine};
    use crate::error::ErrorKind;
    use crate::pipeline::{Handler, Reply, RequestContext};
    use crate::storage::InMemoryUsers;
    use crate::test_support::{bearer, claims_for, seeded_user, K1_PRIVATE, K1_PUBLIC, TEST_ISSUER};

    fn authenticator() -> Authenticator {
        Authenticator::new(
            Arc::new(KeyStore::new().with_key_pair("k1", K1_PRIVATE, K1_PUBLIC)),
            Arc::new(PolicyEngine::default()),
            TEST_ISSUER,
        )
    }

    /// Terminal handler that counts invocations and echoes the caller id.
    fn counting(calls: Arc<AtomicUsize>) -> Handler {
        handler(move |ctx| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let claims = ctx.claims()?;
                Reply::ok(serde_json::json!({
                    "user_id": ctx.user_id()?,
                    "sub": claims.sub,
                }))
            }
        })
    }

    fn request(authorization: &str) -> RequestContext {
        RequestContext::new(Method::GET, "/v1/users/me").with_authorization(authorization)
    }

    #[tokio::test]
    async fn valid_token_fills_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = authenticate(authenticator())(counting(calls.clone()));
        let id = Uuid::new_v4();

        let reply = route(request(&bearer(&claims_for(id, &["USER"])))).await.unwrap();
        let Reply::Json { body, .. } = reply else {
            panic!("expected a JSON reply");
        };
        assert_eq!(body["user_id"], id.to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_never_reach_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = authenticate(authenticator())(counting(calls.clone()));

        for header in ["", "Bearer", "Bearer abc.def.ghi", "Token abc", "Bearer a b"] {
            let err = route(request(header)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthenticated, "header {header:?}");
            assert_eq!(err.message(), UNAUTHENTICATED_MESSAGE);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_uuid_subject_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = authenticate(authenticator())(counting(calls.clone()));

        let mut claims = claims_for(Uuid::new_v4(), &["USER"]);
        claims.sub = "user_2x9".to_string();
        let err = route(request(&bearer(&claims))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_user_check_times_out_as_unauthenticated() {
        let users = InMemoryUsers::new().with_latency(Duration::from_secs(5));
        let user = seeded_user(&users, &["USER"]).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let route = authenticate(authenticator().with_user_check(Arc::new(users)))(counting(
            calls.clone(),
        ));

        let started = Instant::now();
        let ctx = request(&bearer(&claims_for(user.id, &["USER"])))
            .with_deadline(Instant::now() + Duration::from_millis(50));
        let err = route(ctx).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert!(err.detail().unwrap().contains("timeout"));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
