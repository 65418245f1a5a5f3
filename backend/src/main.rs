//! Main entry point for the Veza backend.
//!
//! This file initializes tracing, loads configuration, opens the database,
//! starts the background maintenance tasks and serves the Axum router until
//! Ctrl-C.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod rate_limit;
mod repositories;
mod services;
mod state;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use database::Database;
use repositories::{
    refresh_token_repository::RefreshTokenRepository, user_repository::UserRepository,
};
use state::AppState;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use utils::clock::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    let pool = db.pool().clone();
    let state = AppState::new(
        &config,
        Arc::new(UserRepository::new(pool.clone())),
        Arc::new(RefreshTokenRepository::new(pool)),
        Arc::new(SystemClock),
    );

    let sweeper = state.rate_limiter.spawn_sweeper();
    let purger = spawn_refresh_token_purge(
        state.clone(),
        Duration::from_secs(config.refresh_token_purge_interval_seconds),
    );

    let app = api::app_router(state);

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting Veza server on port {}", config.server_port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    purger.abort();
    db.close().await;
    info!("Server stopped");
    Ok(())
}

/// Periodically deletes refresh tokens whose expiry has passed.
fn spawn_refresh_token_purge(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match state.tokens.purge_expired_refresh_tokens().await {
                Ok(0) => {}
                Ok(purged) => info!("Purged {} expired refresh tokens", purged),
                Err(e) => error!("Refresh token purge failed: {}", e),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
