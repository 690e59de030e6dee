//! Invalidation REST API Routes
//!
//! Upstream editors call this after changing a record. The body is the
//! change event itself, tagged by `subject`:
//!
//! ```json
//! {"subject": "service", "id": "5f0c..."}
//! {"subject": "staticPage", "slug": "about"}
//! {"subject": "company"}
//! ```

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use pagewright_storage::InvalidationEvent;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::{InvalidationOutcome, InvalidationService};
use crate::state::AppState;

/// POST /api/v1/invalidate - Evict cached inputs and flag affected pages
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/invalidate",
    tag = "Cache",
    request_body = InvalidationEvent,
    responses(
        (status = 200, description = "Invalidation applied", body = InvalidationOutcome),
        (status = 400, description = "Unknown subject or malformed body", body = ApiError),
    ),
))]
pub async fn invalidate(
    State(invalidation): State<Arc<InvalidationService>>,
    body: Result<Json<InvalidationEvent>, JsonRejection>,
) -> ApiResult<Json<InvalidationOutcome>> {
    let Json(event) = body?;
    if let InvalidationEvent::StaticPage { slug } = &event {
        if slug.trim().is_empty() {
            return Err(ApiError::missing_field("slug"));
        }
    }

    let outcome = invalidation.invalidate(&event).await?;
    Ok(Json(outcome))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", post(invalidate))
}
