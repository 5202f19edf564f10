// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Both enums keep the full diagnostic chain. Conversion into [`AppError`]
//! keeps that chain as log detail and hands the caller a coarse message only.

use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use super::claims::{ClaimsError, CodecError};
use super::keys::KeyError;
use super::policy::PolicyError;
use crate::error::{AppError, INTERNAL_MESSAGE};
use crate::storage::LookupError;

/// Message returned for every rejected credential.
pub const UNAUTHENTICATED_MESSAGE: &str = "authentication failed";

/// Message returned for every rejected authorization.
pub const UNAUTHORIZED_MESSAGE: &str = "authorize: you are not authorized for that action";

/// Message returned when a path id is not a UUID.
pub const INVALID_ID_MESSAGE: &str = "ID is not in its proper form";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("expected authorization header format: Bearer <token>")]
    InvalidAuthHeader,
    #[error("error parsing token: {0}")]
    MalformedToken(#[source] CodecError),
    #[error("failed to fetch public key: {0}")]
    KeyLookup(#[source] KeyError),
    #[error("authentication failed: {0}")]
    PolicyRejected(#[source] PolicyError),
    #[error("invalid subject: {0}")]
    InvalidSubject(#[source] ClaimsError),
    #[error("user not enabled: query user: {0}")]
    UserLookup(#[source] LookupError),
    #[error("user not enabled: user {0} disabled")]
    UserDisabled(Uuid),
    #[error("authentication timed out during {0}")]
    Timeout(&'static str),
    #[error("request cancelled")]
    Cancelled,
    #[error("signing token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable machine-readable code, for logs and tests.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken(CodecError::MissingKeyId) => "missing_kid",
            AuthError::MalformedToken(CodecError::KeyIdNotString) => "malformed_kid",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::KeyLookup(_) => "no_matching_key",
            AuthError::PolicyRejected(_) => "policy_rejected",
            AuthError::InvalidSubject(_) => "invalid_subject",
            AuthError::UserLookup(_) => "user_lookup_failed",
            AuthError::UserDisabled(_) => "user_disabled",
            AuthError::Timeout(_) => "timeout",
            AuthError::Cancelled => "cancelled",
            AuthError::Signing(_) => "signing_failed",
        }
    }
}

impl From<AuthError> for AppError {
    #[track_caller]
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(_) => AppError::internal(INTERNAL_MESSAGE),
            _ => AppError::unauthenticated(UNAUTHENTICATED_MESSAGE),
        }
        .with_detail(format!("{}: {err}", err.error_code()))
    }
}

/// Failures of the three authorization call shapes.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("claims missing from request context")]
    NoClaims,
    #[error("{INVALID_ID_MESSAGE}: {0:?}")]
    InvalidId(String),
    #[error("claims[{roles:?}] rule[{rule}]: {source}")]
    Denied {
        roles: BTreeSet<String>,
        rule: String,
        #[source]
        source: PolicyError,
    },
    #[error("querybyid: {0}")]
    UserLookup(#[source] LookupError),
    #[error("querybyid: {0}")]
    ProductLookup(#[source] LookupError),
}

impl From<AuthzError> for AppError {
    #[track_caller]
    fn from(err: AuthzError) -> Self {
        let app = match &err {
            AuthzError::InvalidId(_) => AppError::unauthenticated(INVALID_ID_MESSAGE),
            AuthzError::ProductLookup(lookup) if !lookup.is_not_found() => {
                AppError::internal(INTERNAL_MESSAGE)
            }
            _ => AppError::unauthenticated(UNAUTHORIZED_MESSAGE),
        };
        app.with_detail(err.to_string())
    }
}
