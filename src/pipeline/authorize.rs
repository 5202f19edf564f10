// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization stages.
//!
//! All three expect the authenticate stage to have filled the claims and
//! user id slots.
//! Resource stages read their target id from the path and store the
//! resolved resource in the context for the handler.

use std::sync::Arc;

use super::{handler, middleware, Interrupted, Middleware};
use crate::auth::{AuthzError, Authorizer};
use crate::storage::{LookupError, ProductLookup, UserLookup};

/// Path parameter naming the target user.
pub const USER_ID_PARAM: &str = "user_id";

/// Path parameter naming the target product.
pub const PRODUCT_ID_PARAM: &str = "product_id";

fn interrupted(why: Interrupted) -> LookupError {
    LookupError::Unavailable(
        match why {
            Interrupted::DeadlineExceeded => "deadline exceeded",
            Interrupted::Cancelled => "request cancelled",
        }
        .to_string(),
    )
}

/// Evaluate `rule` with the caller as its own subject.
pub fn authorize(authorizer: Authorizer, rule: &'static str) -> Middleware {
    middleware(move |next| {
        let authorizer = authorizer.clone();
        handler(move |ctx| {
            let next = next.clone();
            let authorizer = authorizer.clone();
            async move {
                let claims = ctx.claims().map_err(|_| AuthzError::NoClaims)?;
                let subject = ctx.user_id().map_err(|_| AuthzError::NoClaims)?;
                authorizer.authorize(claims, subject, rule)?;
                next(ctx).await
            }
        })
    })
}

/// Resolve the user named by the `user_id` path parameter and evaluate
/// `rule` against it. Every failure, lookup failures included, is reported
/// as `Unauthenticated`.
pub fn authorize_user(
    authorizer: Authorizer,
    users: Arc<dyn UserLookup>,
    rule: &'static str,
) -> Middleware {
    middleware(move |next| {
        let authorizer = authorizer.clone();
        let users = users.clone();
        handler(move |ctx| {
            let next = next.clone();
            let authorizer = authorizer.clone();
            let users = users.clone();
            async move {
                let claims = ctx.claims().map_err(|_| AuthzError::NoClaims)?;
                let target = ctx.param(USER_ID_PARAM);

                let user = ctx
                    .bounded(authorizer.authorize_user(users.as_ref(), claims, target, rule))
                    .await
                    .unwrap_or_else(|why| Err(AuthzError::UserLookup(interrupted(why))))?;

                let ctx = match user {
                    Some(user) => ctx.set_user(user)?,
                    None => ctx,
                };
                next(ctx).await
            }
        })
    })
}

/// Resolve the product named by the `product_id` path parameter and require
/// the caller to be an admin or the product's owner. A missing product is
/// `Unauthenticated`; a failing lookup is `Internal`.
pub fn authorize_product(authorizer: Authorizer, products: Arc<dyn ProductLookup>) -> Middleware {
    middleware(move |next| {
        let authorizer = authorizer.clone();
        let products = products.clone();
        handler(move |ctx| {
            let next = next.clone();
            let authorizer = authorizer.clone();
            let products = products.clone();
            async move {
                let claims = ctx.claims().map_err(|_| AuthzError::NoClaims)?;
                let target = ctx.param(PRODUCT_ID_PARAM);

                let product = ctx
                    .bounded(authorizer.authorize_product(products.as_ref(), claims, target))
                    .await
                    .unwrap_or_else(|why| Err(AuthzError::ProductLookup(interrupted(why))))?;

                let ctx = match product {
                    Some(product) => ctx.set_product(product)?,
                    None => ctx,
                };
                next(ctx).await
            }
        })
    })
}
