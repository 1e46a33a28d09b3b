mod api;
mod config;
mod dispatch;
mod error;
mod geo;
mod models;
mod notify;
mod observability;
mod pricing;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::models::captain::GeoPoint;
use crate::pricing::provider::StaticDistanceProvider;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    // Demo geocoding table; a real deployment injects a provider backed by
    // an external distance-matrix service here.
    let provider = StaticDistanceProvider::new(30.0)
        .with_address("olaya district", GeoPoint { lat: 24.6933, lng: 46.6853 })
        .with_address("al malaz", GeoPoint { lat: 24.6664, lng: 46.7350 })
        .with_address("king fahd road", GeoPoint { lat: 24.7425, lng: 46.6580 })
        .with_address("diplomatic quarter", GeoPoint { lat: 24.6800, lng: 46.6220 });

    let shared_state = Arc::new(state::AppState::new(&config, Arc::new(provider)));
    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
