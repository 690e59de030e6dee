//! Published static pages, served at `/p/{slug}`.

use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::error::{ApiError, HtmlError};
use crate::services::PublishPipeline;
use crate::state::AppState;

/// GET /p/{slug} - Serve a published static page
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/p/{slug}",
    tag = "Publish",
    params(
        ("slug" = String, Path, description = "Static page slug"),
    ),
    responses(
        (status = 200, description = "Published document", content_type = "text/html", body = String),
        (status = 404, description = "Not published", content_type = "text/html", body = String),
    ),
))]
pub async fn serve_static_page(
    State(publish): State<Arc<PublishPipeline>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, HtmlError> {
    let html = publish
        .published_static_page(&slug)
        .await
        .map_err(ApiError::from)?;
    Ok(Html(html))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:slug", get(serve_static_page))
}
