//! Render REST API Routes
//!
//! Two entry points onto the render pipeline: the public HTML route that
//! browsers hit at `/{area_slug}/{service_slug}`, and a JSON route that
//! returns the content fragment and page metadata for embedding callers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pagewright_core::page_path;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::error::{ApiError, ApiResult, HtmlError};
use crate::services::{PageMeta, RenderPipeline};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Request body for `POST /api/v1/render`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Page path, e.g. `/metairie/roof-repair`.
    pub url_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    /// Compiled template output, without the page shell.
    pub content: String,
    pub page_data: PageMeta,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /{area_slug}/{service_slug} - Serve a generated page as HTML
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/{area_slug}/{service_slug}",
    tag = "Render",
    params(
        ("area_slug" = String, Path, description = "Service area slug"),
        ("service_slug" = String, Path, description = "Service slug"),
    ),
    responses(
        (status = 200, description = "Rendered page", content_type = "text/html", body = String),
        (status = 304, description = "Unchanged since the given ETag"),
        (status = 404, description = "No such page", content_type = "text/html", body = String),
    ),
))]
pub async fn render_page(
    State(render): State<Arc<RenderPipeline>>,
    State(config): State<Arc<RenderConfig>>,
    Path((area_slug, service_slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, HtmlError> {
    let path = page_path(&area_slug, &service_slug);
    let outcome = render.render(&path).await.map_err(ApiError::from)?;

    let etag = format!("\"{}\"", outcome.etag);
    let cache_control = config.cache_control();
    let mut response = if etag_matches(&headers, &outcome.etag) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Html(outcome.html).into_response()
    };

    let response_headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        response_headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response_headers.insert(header::ETAG, value);
    }
    Ok(response)
}

/// POST /api/v1/render - Render a page and return its fragment and metadata
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/render",
    tag = "Render",
    request_body = RenderRequest,
    responses(
        (status = 200, description = "Rendered content", body = RenderResponse),
        (status = 400, description = "Missing urlPath", body = ApiError),
        (status = 404, description = "No such page", body = ApiError),
        (status = 500, description = "Page could not be produced", body = ApiError),
    ),
))]
pub async fn render_json(
    State(render): State<Arc<RenderPipeline>>,
    body: Result<Json<RenderRequest>, JsonRejection>,
) -> ApiResult<Json<RenderResponse>> {
    let Json(req) = body?;
    let path = normalize_path(req.url_path.as_deref()).ok_or_else(|| ApiError::missing_field("urlPath"))?;

    let outcome = render.render(&path).await?;
    Ok(Json(RenderResponse {
        content: outcome.content,
        page_data: outcome.page_data,
    }))
}

/// Trim and root a caller-supplied path. Blank input is treated as absent.
fn normalize_path(raw: Option<&str>) -> Option<String> {
    let trimmed = raw.map(str::trim).filter(|s| !s.is_empty())?;
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Whether an `If-None-Match` header names this render. Accepts weak
/// validators, comma-separated lists and `*`.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/").trim_matches('"') == etag
    })
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes mounted under `/api/v1/render`.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/", post(render_json))
}

/// The public `/{area_slug}/{service_slug}` page route.
pub fn create_page_router() -> Router<AppState> {
    Router::new().route("/:area_slug/:service_slug", get(render_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Some("/metairie/roof-repair")).as_deref(), Some("/metairie/roof-repair"));
        assert_eq!(normalize_path(Some(" metairie/roof-repair ")).as_deref(), Some("/metairie/roof-repair"));
        assert_eq!(normalize_path(Some("   ")), None);
        assert_eq!(normalize_path(None), None);
    }

    #[test]
    fn test_etag_matches_variants() {
        let mut headers = HeaderMap::new();
        assert!(!etag_matches(&headers, "abc"));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"abc\""));
        assert!(etag_matches(&headers, "abc"));
        assert!(!etag_matches(&headers, "abd"));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("W/\"zzz\", \"abc\""));
        assert!(etag_matches(&headers, "abc"));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(etag_matches(&headers, "anything"));
    }

    #[test]
    fn test_render_request_accepts_missing_url_path() {
        let req: RenderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.url_path.is_none());

        let req: RenderRequest = serde_json::from_str(r#"{"urlPath":"/kenner/roof-repair"}"#).unwrap();
        assert_eq!(req.url_path.as_deref(), Some("/kenner/roof-repair"));
    }
}
