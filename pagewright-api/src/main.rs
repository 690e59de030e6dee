//! PAGEWRIGHT API Server Entry Point
//!
//! Bootstraps configuration, seeds the content store, starts the cache
//! reaper and serves the Axum router until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use pagewright_api::constants::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use pagewright_api::telemetry::{init_tracer, TelemetryConfig};
use pagewright_api::{
    cache_reaper_task, create_api_router, ApiConfig, ApiError, ApiResult, AppState,
    CacheReaperConfig, RenderConfig, SeedData,
};
use pagewright_storage::{CachePolicy, MemoryCacheStore, MemoryContentStore};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let render_config = RenderConfig::from_env();

    let store = MemoryContentStore::new();
    let seed = match std::env::var("PAGEWRIGHT_SEED_FILE") {
        Ok(path) => {
            let seed = SeedData::load(&PathBuf::from(path))?;
            seed.apply(&store)?;
            Some(seed)
        }
        Err(_) => {
            tracing::warn!("PAGEWRIGHT_SEED_FILE not set, starting with an empty content store");
            None
        }
    };

    let cache = Arc::new(MemoryCacheStore::new(CachePolicy::from_env()));
    let state = AppState::new(Arc::new(store), cache.clone(), render_config);

    if let Some(seed) = &seed {
        let created = seed.provision(&state.regenerator).await?;
        tracing::info!(created, "Generated pages provisioned");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = tokio::spawn(cache_reaper_task(
        cache,
        CacheReaperConfig::from_env(),
        shutdown_rx,
    ));

    let app: Router = create_api_router(state, &api_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting PAGEWRIGHT API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = reaper.await {
        tracing::warn!(error = %e, "Cache reaper did not stop cleanly");
    }
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PAGEWRIGHT_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("PAGEWRIGHT_API_PORT").ok())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
