//! Presence Relay web server.
//!
//! Receives Zoom presence webhooks, relays them to Slack, serves the
//! allow-list API and the static admin page.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use presence_relay::db::establish_connection_pool;
use presence_relay::web::router;
use presence_relay::{
    load_workspaces, AllowListStore, AppState, Config, PgAllowList, SlackClient, StatusRelay,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

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
        database_configured = config.database_url.is_some(),
        database_ssl = ?config.database_ssl,
        api_key_configured = config.api_key.is_some(),
        zoom_secret_configured = config.zoom_secret_token.is_some(),
        meeting_presence = %config.meeting_presence,
        "config_loaded"
    );

    let workspaces = load_workspaces(&config)?;
    info!(workspaces = ?workspaces.names(), "workspaces_ready");

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    let pool = establish_connection_pool(database_url, config.database_ssl)?;
    let allow_list: Arc<dyn AllowListStore> = Arc::new(PgAllowList::new(pool));
    info!("database_pool_created");

    let http = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    let slack = SlackClient::new(http, &config.slack_api_base)
        .context("Invalid SLACK_API_BASE")?;

    let relay = StatusRelay::new(
        workspaces,
        allow_list.clone(),
        slack,
        config.meeting_presence.clone(),
    );

    let port = config.port;
    let state = AppState::new(config, relay, allow_list);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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
