// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authgate - Request Authentication / Authorization Pipeline
//!
//! Every inbound request passes through a fixed middleware chain before it
//! reaches a handler: logging, error translation, metrics, panic containment,
//! bearer token authentication and rule based authorization.
//!
//! ## Modules
//!
//! - `api` - HTTP routes (Axum) and the bridge into the pipeline
//! - `auth` - Token codec, key store, policy rules, authenticator, authorizer
//! - `pipeline` - Handler/middleware types, chain composer, middlewares
//! - `storage` - User and product lookups (in-memory)
//! - `metrics` - Process-wide request counters

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
