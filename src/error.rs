// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application error taxonomy and its wire representation.
//!
//! Every error leaving the middleware chain is an [`AppError`]. Its
//! [`ErrorKind`] decides the HTTP status; the message is what the caller sees.
//! `detail` and `site` exist only for the server log.

use std::fmt;
use std::panic::Location;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Message used whenever internal detail must not reach the caller.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Error classes understood by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad, missing or invalid credential; disabled account; failed authorization.
    Unauthenticated,
    /// Malformed request body or parameters.
    FailedPrecondition,
    /// Resource absent. Never returned by the authorizer.
    NotFound,
    /// Unexpected server failure, including recovered panics.
    Internal,
    /// Server fault logged in full but reported as a generic internal error.
    InternalOnlyLog,
}

impl ErrorKind {
    /// HTTP status for this kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::FailedPrecondition => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal | ErrorKind::InternalOnlyLog => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for kinds the error translator must log.
    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
            ErrorKind::InternalOnlyLog => "internal_only_log",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with a kind and the source location that created it.
#[derive(Debug, Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
    site: &'static Location<'static>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl AppError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            site: Location::caller(),
        }
    }

    #[track_caller]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    #[track_caller]
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[track_caller]
    pub fn internal_only_log(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalOnlyLog, message)
    }

    /// Coerce an untagged error into a generic internal error. The original
    /// text survives only as log detail.
    #[track_caller]
    pub fn untagged(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::internal(INTERNAL_MESSAGE).with_detail(err.to_string())
    }

    /// Attach diagnostic detail that is logged but never sent to the caller.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// `file:line` of the construction site.
    pub fn site(&self) -> String {
        format!("{}:{}", self.site.file(), self.site.line())
    }

    /// Base name of the source file that created this error.
    pub fn site_file(&self) -> &'static str {
        let file = self.site.file();
        file.rsplit(['/', '\\']).next().unwrap_or(file)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Rewrite into the form that may be shown to a caller.
    ///
    /// `InternalOnlyLog` collapses into a generic `Internal` error; all other
    /// kinds pass through untouched.
    pub fn into_public(self) -> Self {
        match self.kind {
            ErrorKind::InternalOnlyLog => Self {
                kind: ErrorKind::Internal,
                message: INTERNAL_MESSAGE.to_string(),
                detail: None,
                site: self.site,
            },
            _ => self,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<Box<dyn std::error::Error + Send + Sync>> for AppError {
    #[track_caller]
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::untagged(err.as_ref())
    }
}

impl From<serde_json::Error> for AppError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::untagged(&err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: &self.message,
        });
        (self.status_code(), body).into_response()
    }
}
