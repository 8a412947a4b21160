// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food API Server
//!
//! Serves user registration, food listings and token-based sessions.

use food_api::{
    config::{Config, StoreBackend},
    db::{MySqlStore, Repositories},
    services::{
        AuthService, LocalFileStorage, MemorySessionCache, RedisSessionCache, SessionCache,
        TokenService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.store_backend, "Starting Food API");

    // Kept so the pool can be drained on shutdown
    let mut mysql: Option<MySqlStore> = None;

    let (repositories, sessions): (Repositories, Arc<dyn SessionCache>) =
        match config.store_backend {
            StoreBackend::MySql => {
                let store = MySqlStore::connect(&config.database).await?;
                store.migrate().await?;
                mysql = Some(store.clone());
                let sessions = RedisSessionCache::connect(config.redis.connection_info()).await?;
                (Repositories::mysql(store), Arc::new(sessions))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store and session cache; data is not persisted");
                (Repositories::memory(), Arc::new(MemorySessionCache::new()))
            }
        };

    let tokens = TokenService::new(
        &config.jwt_signing_key,
        config.access_token_ttl,
        config.refresh_token_ttl,
    );
    let auth = AuthService::new(repositories.users.clone(), tokens, sessions);

    let storage = LocalFileStorage::new(&config.upload_dir, &config.public_upload_url);
    tracing::info!(dir = %storage.dir().display(), "File storage initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        users: repositories.users,
        foods: repositories.foods,
        auth,
        storage: Arc::new(storage),
    });

    // Build router
    let app = food_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = mysql {
        store.close().await;
        tracing::info!("Database pool closed");
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("food_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
