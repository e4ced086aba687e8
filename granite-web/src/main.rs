//! # Granite Flow Web Server
//!
//! Serves the Granite Flow dashboard's page view models and JSON API in
//! front of a hosted backend that owns data, identity and row-level
//! permissions.
//!
//! ## Usage
//!
//! ```bash
//! GRANITE_GATEWAY_URL=https://project.example.co \
//! GRANITE_GATEWAY_KEY=public-anon-key \
//! cargo run -p granite-web
//! ```

use granite_shared::gateway::http::RestGateway;
use granite_web::{
    app::{build_router, AppState},
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "granite_web=debug,granite_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Granite Flow web server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let gateway = RestGateway::new(config.gateway.url.as_str(), config.gateway.key.as_str())?;
    tracing::info!(gateway = %gateway.base_url(), "Gateway configured");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(Arc::new(gateway), config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

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
    tracing::info!("Shutdown signal received, exiting...");
}
