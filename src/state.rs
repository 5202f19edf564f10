// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::policy::Namespace;
use crate::auth::{Authenticator, Authorizer, KeyLookup, PolicyEngine};
use crate::config::{Settings, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::metrics::Metrics;
use crate::pipeline::{errors, logger, metrics, panics, Chain};
use crate::storage::{ProductLookup, UserLookup};

/// Everything route construction needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Authenticator,
    pub authorizer: Authorizer,
    pub users: Arc<dyn UserLookup>,
    pub products: Arc<dyn ProductLookup>,
    pub metrics: Arc<Metrics>,
    pub request_timeout: Duration,
    /// Key id used by token issuance; issuance is refused when unset
    pub active_kid: Option<String>,
}

impl AppState {
    /// Wire collaborators with default behaviour: account check on, default
    /// metrics sampling and request timeout.
    pub fn new(
        keys: Arc<dyn KeyLookup>,
        users: Arc<dyn UserLookup>,
        products: Arc<dyn ProductLookup>,
        issuer: impl Into<String>,
    ) -> Self {
        let engine = Arc::new(PolicyEngine::default());
        Self {
            authenticator: Authenticator::new(keys, engine.clone(), issuer)
                .with_user_check(users.clone()),
            authorizer: Authorizer::new(engine),
            users,
            products,
            metrics: Arc::new(Metrics::default()),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            active_kid: None,
        }
    }

    pub fn with_active_kid(mut self, kid: impl Into<String>) -> Self {
        self.active_kid = Some(kid.into());
        self
    }

    /// Wire collaborators according to `settings`.
    pub fn from_settings(
        settings: &Settings,
        keys: Arc<dyn KeyLookup>,
        users: Arc<dyn UserLookup>,
        products: Arc<dyn ProductLookup>,
    ) -> Self {
        let engine = Arc::new(PolicyEngine::default());
        tracing::info!(
            authentication = ?engine.rule_names(Namespace::Authentication),
            authorization = ?engine.rule_names(Namespace::Authorization),
            "Policy rules loaded"
        );

        let mut authenticator = Authenticator::new(keys, engine.clone(), settings.issuer.clone());
        if settings.user_enabled_check {
            authenticator = authenticator.with_user_check(users.clone());
        }

        Self {
            authenticator,
            authorizer: Authorizer::new(engine),
            users,
            products,
            metrics: Arc::new(Metrics::new(settings.metrics_sample_every)),
            request_timeout: settings.request_timeout,
            active_kid: settings.active_kid.clone(),
        }
    }

    /// The global middlewares, outermost first.
    pub fn chain(&self) -> Chain {
        Chain::new(vec![
            logger(),
            errors(),
            metrics(self.metrics.clone()),
            panics(self.metrics.clone()),
        ])
    }
}
