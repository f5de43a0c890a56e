mod api;
mod errors;
mod models;
mod state;

use crate::errors::ApiError;
use crate::state::AppState;
use ledger_zk::PipelineConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("PIPELINE_CONFIG") {
        Ok(path) => PipelineConfig::load(&PathBuf::from(path)),
        Err(_) => Ok(PipelineConfig::default()),
    }
    .and_then(PipelineConfig::with_env_overrides)
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let circuits_dir = PathBuf::from(std::env::var("CIRCUITS_DIR").unwrap_or_else(|_| "circuits".to_string()));

    // Compiled artifacts and keys live under <DATA_DIR>/artifacts.
    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    let artifacts_dir = data_dir.join("artifacts");
    std::fs::create_dir_all(&artifacts_dir).map_err(|e| ApiError::Internal(e.to_string()))?;

    let api_key = std::env::var("API_KEY").unwrap_or_else(|_| {
        tracing::warn!("API_KEY not set, using the development key");
        "dev-secret-key".to_string()
    });

    let state = AppState::discover(&circuits_dir, &artifacts_dir, config, api_key)
        .map_err(|e| ApiError::Internal(format!("reading {}: {e}", circuits_dir.display())))?;
    tracing::info!(circuits = state.names().count(), "circuits loaded");

    let app = api::router(state);

    let addr = std::env::var("BACKEND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(%addr, "prover service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
