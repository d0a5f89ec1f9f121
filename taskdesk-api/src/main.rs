//! # TaskDesk API Server
//!
//! Serves the task REST API: login, token verification and per-user task
//! CRUD behind CORS, rate limiting and security headers.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... DATABASE_URL=postgresql://... cargo run -p taskdesk-api
//! # or without PostgreSQL, with the demo account preloaded:
//! JWT_SECRET=... DATABASE_URL=memory:// cargo run -p taskdesk-api
//! ```

use std::net::SocketAddr;
use taskdesk_api::{
    app::{build_router, AppState},
    bootstrap::{init_tracing, open_store, rate_limit_counters},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(
        "taskdesk_api=debug,tower_http=debug",
        config.api.environment.is_production(),
    );

    tracing::info!(
        environment = %config.api.environment,
        frontend_url = %config.api.frontend_url,
        "TaskDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = open_store(&config).await?;
    let counters = rate_limit_counters(&config).await?;
    let address = config.bind_address();

    let state = AppState::with_rate_limit_store(store, config, counters);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
