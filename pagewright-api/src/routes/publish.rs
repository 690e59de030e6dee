//! Publish REST API Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use pagewright_core::{EntityId, PageType, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::services::{parse_target, PublishPipeline};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Request body for `POST /api/v1/publish`. Both fields are required; they
/// are optional here so a missing one is reported as a 400 naming it.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// UUID of the static page or service.
    pub page_id: Option<String>,
    /// `static` or `service`.
    pub page_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub page_id: EntityId,
    pub page_type: PageType,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub published_at: Timestamp,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/publish - Publish a static or service page draft
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/publish",
    tag = "Publish",
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Page published", body = PublishResponse),
        (status = 400, description = "Missing or invalid arguments", body = crate::error::ApiError),
        (status = 404, description = "Record or draft not found", body = crate::error::ApiError),
        (status = 500, description = "Draft malformed or not persisted", body = crate::error::ApiError),
    ),
))]
pub async fn publish_page(
    State(publish): State<Arc<PublishPipeline>>,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResult<Json<PublishResponse>> {
    let Json(req) = body?;
    let (page_id, page_type) = parse_target(req.page_id.as_deref(), req.page_type.as_deref())?;

    let outcome = publish.publish(page_id, page_type).await?;
    Ok(Json(PublishResponse {
        success: true,
        page_id: outcome.page_id,
        page_type: outcome.page_type,
        published_at: outcome.published_at,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", post(publish_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::new_entity_id;

    #[test]
    fn test_publish_response_wire_format() {
        let response = PublishResponse {
            success: true,
            page_id: new_entity_id(),
            page_type: PageType::Static,
            published_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pageType"], "static");
        assert!(json.get("pageId").is_some());
        assert!(json.get("publishedAt").is_some());
    }
}
