// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user and product lookups.
//!
//! Both stores can be told to fail (`set_outage`) or to answer slowly
//! (`with_latency`), which is how deadline and outage handling is exercised
//! without a real backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LookupError, Product, ProductLookup, User, UserLookup};

#[derive(Debug)]
struct Table<T> {
    rows: HashMap<Uuid, T>,
    outage: Option<String>,
}

#[derive(Debug, Clone)]
struct Store<T> {
    table: Arc<RwLock<Table<T>>>,
    latency: Option<Duration>,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table {
                rows: HashMap::new(),
                outage: None,
            })),
            latency: None,
        }
    }
}

impl<T: Clone> Store<T> {
    async fn get(&self, resource: &'static str, id: Uuid) -> Result<T, LookupError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let table = self.table.read().await;
        if let Some(reason) = &table.outage {
            return Err(LookupError::Unavailable(reason.clone()));
        }
        table
            .rows
            .get(&id)
            .cloned()
            .ok_or(LookupError::NotFound { resource, id })
    }

    async fn put(&self, id: Uuid, row: T) {
        self.table.write().await.rows.insert(id, row);
    }

    async fn set_outage(&self, reason: Option<String>) {
        self.table.write().await.outage = reason;
    }
}

/// User accounts held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsers {
    store: Store<User>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.store.latency = Some(latency);
        self
    }

    pub async fn insert(&self, user: User) {
        self.store.put(user.id, user).await;
    }

    /// Enable or disable an account. Returns false when the user is unknown.
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> bool {
        let mut table = self.store.table.write().await;
        match table.rows.get_mut(&id) {
            Some(user) => {
                user.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Make every lookup fail with `reason`, or clear the outage with `None`.
    pub async fn set_outage(&self, reason: Option<String>) {
        self.store.set_outage(reason).await;
    }
}

#[async_trait]
impl UserLookup for InMemoryUsers {
    async fn query_by_id(&self, id: Uuid) -> Result<User, LookupError> {
        self.store.get("user", id).await
    }
}

/// Products held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProducts {
    store: Store<Product>,
}

impl InMemoryProducts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.store.latency = Some(latency);
        self
    }

    pub async fn insert(&self, product: Product) {
        self.store.put(product.id, product).await;
    }

    /// Make every lookup fail with `reason`, or clear the outage with `None`.
    pub async fn set_outage(&self, reason: Option<String>) {
        self.store.set_outage(reason).await;
    }
}

#[async_trait]
impl ProductLookup for InMemoryProducts {
    async fn query_by_id(&self, id: Uuid) -> Result<Product, LookupError> {
        self.store.get("product", id).await
    }
}
