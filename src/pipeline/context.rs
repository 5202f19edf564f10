// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request context threaded through the middleware chain.
//!
//! The context is an owned value passed by parameter. Middlewares that learn
//! something (claims, the resolved user or product) return a new context
//! with the slot filled. Slots are set once; reading a slot before the
//! middleware responsible for it ran is a wiring bug and surfaces as
//! [`ContextError::NotSet`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::Method;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, INTERNAL_MESSAGE};
use crate::storage::{Product, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("{0} not set in request context")]
    NotSet(&'static str),
    #[error("{0} already set in request context")]
    AlreadySet(&'static str),
}

impl From<ContextError> for AppError {
    #[track_caller]
    fn from(err: ContextError) -> Self {
        AppError::internal(INTERNAL_MESSAGE).with_detail(err.to_string())
    }
}

/// Why a request stopped waiting on a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    DeadlineExceeded,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: Method,
    path: String,
    authorization: Option<String>,
    params: Arc<HashMap<String, String>>,
    body: Bytes,
    deadline: Option<Instant>,
    cancel: CancellationToken,

    claims: Option<Arc<Claims>>,
    user_id: Option<Uuid>,
    user: Option<Arc<User>>,
    product: Option<Arc<Product>>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            authorization: None,
            params: Arc::default(),
            body: Bytes::new(),
            deadline: None,
            cancel: CancellationToken::new(),
            claims: None,
            user_id: None,
            user: None,
            product: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = Arc::new(params);
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw `Authorization` header value. Empty when absent.
    pub fn authorization(&self) -> &str {
        self.authorization.as_deref().unwrap_or_default()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `fut` until it finishes, the deadline passes or the request is
    /// cancelled, whichever comes first.
    pub async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let cancelled = self.cancel.cancelled();
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => Err(Interrupted::Cancelled),
                out = tokio::time::timeout_at(deadline, fut) => {
                    out.map_err(|_| Interrupted::DeadlineExceeded)
                }
            },
            None => tokio::select! {
                _ = cancelled => Err(Interrupted::Cancelled),
                out = fut => Ok(out),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Set-once slots
    // -------------------------------------------------------------------------

    pub fn claims(&self) -> Result<&Claims, ContextError> {
        self.claims.as_deref().ok_or(ContextError::NotSet("claims"))
    }

    pub fn set_claims(mut self, claims: Claims) -> Result<Self, ContextError> {
        fill(&mut self.claims, Arc::new(claims), "claims")?;
        Ok(self)
    }

    /// Caller id, parsed from the claims subject.
    pub fn user_id(&self) -> Result<Uuid, ContextError> {
        self.user_id.ok_or(ContextError::NotSet("user_id"))
    }

    pub fn set_user_id(mut self, user_id: Uuid) -> Result<Self, ContextError> {
        fill(&mut self.user_id, user_id, "user_id")?;
        Ok(self)
    }

    /// User resolved by user authorization.
    pub fn user(&self) -> Result<&User, ContextError> {
        self.user.as_deref().ok_or(ContextError::NotSet("user"))
    }

    pub fn set_user(mut self, user: User) -> Result<Self, ContextError> {
        fill(&mut self.user, Arc::new(user), "user")?;
        Ok(self)
    }

    /// Product resolved by product authorization.
    pub fn product(&self) -> Result<&Product, ContextError> {
        self.product.as_deref().ok_or(ContextError::NotSet("product"))
    }

    pub fn set_product(mut self, product: Product) -> Result<Self, ContextError> {
        fill(&mut self.product, Arc::new(product), "product")?;
        Ok(self)
    }
}

fn fill<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), ContextError> {
    if slot.is_some() {
        return Err(ContextError::AlreadySet(name));
    }
    *slot = Some(value);
    Ok(())
}
