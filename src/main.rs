// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeSet;
use std::sync::Arc;

use authgate::api::router;
use authgate::auth::{KeyLookup, KeyStore, Role};
use authgate::config::Settings;
use authgate::state::AppState;
use authgate::storage::{InMemoryProducts, InMemoryUsers, User};
use authgate::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    telemetry::init();

    let settings = Settings::from_env()?;
    let keys = KeyStore::load_dir(&settings.keys_dir)?;
    if keys.is_empty() {
        tracing::warn!(dir = %settings.keys_dir.display(), "No signing keys loaded; every token will be rejected");
    }
    if let Some(kid) = &settings.active_kid {
        match keys.private_key(kid).await {
            Ok(_) => tracing::info!(%kid, "Active signing key"),
            Err(err) => tracing::warn!(%kid, error = %err, "Active signing key unusable"),
        }
    }

    let users = InMemoryUsers::new();
    if let Some(id) = settings.seed_admin_id {
        users
            .insert(User {
                id,
                name: "admin".to_string(),
                email: String::new(),
                roles: BTreeSet::from([Role::Admin.to_string()]),
                enabled: true,
            })
            .await;
        tracing::info!(%id, "Seeded admin account");
    }

    let state = AppState::from_settings(
        &settings,
        Arc::new(keys),
        Arc::new(users),
        Arc::new(InMemoryProducts::new()),
    );
    let app = router(state);

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, issuer = %settings.issuer, "Authgate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
