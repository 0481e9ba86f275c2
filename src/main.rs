mod api;
mod auth;
mod config;
mod error;
mod geo;
mod ledger;
mod lifecycle;
mod matching;
mod models;
mod observability;
mod payments;
mod state;
mod store;
mod verification;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::payments::gateway::MockGateway;
use crate::store::Store;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let store = Store::new();
    auth::bootstrap_admin(&store, &config.admin_token);

    let gateway = Arc::new(MockGateway::new(config.gateway_auto_confirm));
    let (app_state, announcement_rx) = state::AppState::new(&config, store, gateway);
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(matching::engine::run_matching_engine(
        shared_state.clone(),
        announcement_rx,
    ));

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
