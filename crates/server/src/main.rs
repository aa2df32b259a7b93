//! Endometriosis Prediction Server
//!
//! Serves the pre-trained regression model over HTTP: single and batch
//! prediction, health/readiness probes, model introspection and an
//! explicit artifact reload action.

use anyhow::Result;
use endo_engine::{EngineMetrics, PredictionEngine};
use endo_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting endo-server");

    let config = ServerConfig::load()?;
    info!(model_dir = %config.model_dir, port = config.api_port, "Server configured");

    let metrics = EngineMetrics::new();
    let engine = Arc::new(PredictionEngine::new(&config.model_dir));

    // A failed initial load is not fatal: the server comes up Unloaded and
    // answers 503 on prediction routes until a successful reload.
    match engine.load() {
        Ok(()) => info!(features = ?engine.feature_order(), "Model artifacts loaded"),
        Err(e) => warn!(
            error = %e,
            "Could not load model artifacts; prediction routes will return 503 until reload"
        ),
    }
    metrics.set_model_loaded(engine.is_ready());

    let state = Arc::new(api::AppState::new(
        engine,
        metrics,
        config.service_name.clone(),
    ));

    let api_handle = tokio::spawn(api::serve(config.api_port, state));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
