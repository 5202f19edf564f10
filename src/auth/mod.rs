// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication and rule based authorization.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>`
//! 2. The server:
//!    - decodes the token header without trusting it and reads `kid`
//!    - resolves the verification key for that `kid`
//!    - evaluates the `authenticate` rule (signature, issuer, expiry)
//!    - optionally checks that the subject's account is enabled
//! 3. Routes then evaluate an authorization rule against the claims and,
//!    for resource routes, the owner of the addressed resource
//!
//! ## Security
//!
//! - Only RS256 tokens are accepted
//! - Clock skew tolerance is 60 seconds
//! - Callers only ever see coarse failure messages; details go to the log

pub mod authenticator;
pub mod authorizer;
pub mod claims;
pub mod error;
pub mod keys;
pub mod policy;
pub mod roles;

pub use authenticator::Authenticator;
pub use authorizer::Authorizer;
pub use claims::Claims;
pub use error::{AuthError, AuthzError};
pub use keys::{KeyLookup, KeyStore};
pub use policy::PolicyEngine;
pub use roles::Role;
