//! Cache administration routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use pagewright_storage::{CacheBackend, CacheStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry::metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClearCacheResponse {
    pub entries_removed: u64,
}

/// GET /api/v1/cache/stats - Cache usage and hit rate
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/cache/stats",
    tag = "Cache",
    responses(
        (status = 200, description = "Current cache statistics", body = CacheStats),
        (status = 500, description = "Cache unavailable", body = crate::error::ApiError),
    ),
))]
pub async fn cache_stats(State(cache): State<Arc<dyn CacheBackend>>) -> ApiResult<Json<CacheStats>> {
    let stats = cache.stats().await?;
    Ok(Json(stats))
}

/// POST /api/v1/cache/clear - Drop every cached entry
///
/// Administrative reset. Generated pages keep their staleness flags, so
/// nothing served afterwards changes except latency.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/cache/clear",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache cleared", body = ClearCacheResponse),
        (status = 500, description = "Cache unavailable", body = crate::error::ApiError),
    ),
))]
pub async fn clear_cache(State(cache): State<Arc<dyn CacheBackend>>) -> ApiResult<Json<ClearCacheResponse>> {
    let entries_removed = cache.clear().await?;
    if let Some(m) = metrics() {
        m.set_cache_entries(0);
    }
    tracing::warn!(entries_removed, "Cache cleared by administrator");
    Ok(Json(ClearCacheResponse { entries_removed }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(cache_stats))
        .route("/clear", post(clear_cache))
}
