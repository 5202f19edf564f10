// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Resource Lookups
//!
//! The authorization pipeline never owns user or product persistence. It
//! resolves resources through [`UserLookup`] and [`ProductLookup`] so that a
//! request targeting a specific resource can be checked against its owner.
//!
//! `memory` provides in-process implementations used by the binary and the
//! test suite.

pub mod memory;
pub mod ownership;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub use memory::{InMemoryProducts, InMemoryUsers};
pub use ownership::OwnedResource;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The resource does not exist
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: Uuid },
    /// The backing store could not answer
    #[error("{0}")]
    Unavailable(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// A user account as seen by the authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: BTreeSet<String>,
    /// Disabled accounts fail authentication
    pub enabled: bool,
}

/// A product owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    pub name: String,
    pub cost: f64,
    pub quantity: u32,
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn query_by_id(&self, id: Uuid) -> Result<User, LookupError>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn query_by_id(&self, id: Uuid) -> Result<Product, LookupError>;
}
