//! Application setup and initialization
//!
//! Everything main.rs needs to go from a loaded [`Config`] to a served router.

pub mod routes;
pub mod server;

use crate::services::gateway::StorageGateway;
use crate::state::AppState;
use anyhow::{Context, Result};
use podstore_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    podstore_infra::init_telemetry("podstore-api", &config.environment, config.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let storage = podstore_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %storage.bucket_name(),
        "Storage backend ready"
    );

    let gateway = StorageGateway::from_config(storage, &config);
    let state = Arc::new(AppState::new(gateway, config.clone()));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
