//! Generated Page REST API Routes
//!
//! Administrative operations over the (service × area) page set:
//! provisioning records for a new service and regenerating stale pages
//! ahead of traffic.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::{PageRegenerator, RegenerationReport};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// UUID of the service whose pages should exist.
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProvisionResponse {
    /// Paths of the pages created by this call.
    pub created: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegenerateRequest {
    /// Maximum pages to regenerate. Defaults to the configured batch size.
    pub limit: Option<usize>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/pages/provision - Create missing pages for a service
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/pages/provision",
    tag = "Pages",
    request_body = ProvisionRequest,
    responses(
        (status = 200, description = "Pages provisioned", body = ProvisionResponse),
        (status = 400, description = "Missing or invalid serviceId", body = ApiError),
        (status = 404, description = "Service not found", body = ApiError),
    ),
))]
pub async fn provision_pages(
    State(regenerator): State<Arc<PageRegenerator>>,
    body: Result<Json<ProvisionRequest>, JsonRejection>,
) -> ApiResult<Json<ProvisionResponse>> {
    let Json(req) = body?;
    let raw = req
        .service_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::missing_field("serviceId"))?;
    let service_id = raw
        .parse()
        .map_err(|_| ApiError::invalid_format("serviceId", "UUID"))?;

    let created = regenerator.provision_service_pages(service_id).await?;
    Ok(Json(ProvisionResponse { created }))
}

/// POST /api/v1/pages/regenerate - Regenerate stale pages in bulk
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/pages/regenerate",
    tag = "Pages",
    request_body = RegenerateRequest,
    responses(
        (status = 200, description = "Regeneration report", body = RegenerationReport),
        (status = 400, description = "Invalid limit", body = ApiError),
    ),
))]
pub async fn regenerate_pages(
    State(regenerator): State<Arc<PageRegenerator>>,
    body: Result<Json<RegenerateRequest>, JsonRejection>,
) -> ApiResult<Json<RegenerationReport>> {
    let Json(req) = body?;
    if req.limit == Some(0) {
        return Err(ApiError::invalid_input("limit must be at least 1"));
    }

    let report = regenerator.regenerate_stale(req.limit).await?;
    Ok(Json(report))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/provision", post(provision_pages))
        .route("/regenerate", post(regenerate_pages))
}
