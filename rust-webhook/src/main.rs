//! UserSync Web Server - identity provider webhook receiver.
//!
//! This binary:
//! - Verifies Svix-signed user lifecycle webhooks
//! - Mirrors them into the local `users` table
//! - Serves a health check and a landing page

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usersync::store::{create_pool, migrate};
use usersync::{router, AppState, Config, SqliteUserStore, Webhook};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        signing_secret_configured = config.signing_secret.is_some(),
        signature_tolerance_secs = config.signature_tolerance_secs,
        "config_loaded"
    );

    let secret = config
        .signing_secret
        .as_deref()
        .context("SIGNING_SECRET must be set")?;
    let webhook = Webhook::new(secret)
        .context("SIGNING_SECRET is not a valid webhook secret")?
        .with_tolerance(config.signature_tolerance_secs);

    // Open the database and make sure the schema exists
    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to open database")?;
    migrate(&pool).await.context("Failed to migrate database")?;
    info!("database_ready");

    let store = SqliteUserStore::new(pool.clone());
    let state = AppState::new(config.clone(), webhook, Arc::new(store));
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
