//! REST API Routes Module
//!
//! Includes:
//! - The public page route `/{area_slug}/{service_slug}` (HTML)
//! - Published static pages under `/p/{slug}` (HTML)
//! - Render, publish, invalidation, page and cache routes under `/api/v1`
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics and the OpenAPI document
//! - CORS support for browser-based editors

pub mod cache;
pub mod health;
pub mod invalidate;
pub mod pages;
pub mod publish;
pub mod render;
pub mod static_page;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, request::Parts, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::constants::{MAX_CONCURRENT_REQUESTS, MAX_REQUEST_BODY_BYTES};
use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// Re-export route creation functions for convenience
pub use cache::create_router as cache_router;
pub use health::create_router as health_router;
pub use invalidate::create_router as invalidate_router;
pub use pages::create_router as pages_router;
pub use publish::create_router as publish_router;
pub use render::create_page_router as page_router;
pub use render::create_router as render_router;
pub use static_page::create_router as static_page_router;

// ============================================================================
// OPENAPI
// ============================================================================

/// GET /openapi.json - OpenAPI document
#[cfg(feature = "openapi")]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins, including `*.`
/// subdomain wildcards.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::IF_NONE_MATCH])
        .expose_headers([header::ETAG, header::CACHE_CONTROL])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(
        "CORS: Production mode - allowing origins: {:?}",
        config.cors_origins
    );
    let allowed = config.clone();
    cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .map(|o| allowed.is_origin_allowed(o))
                .unwrap_or(false)
        },
    ))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes under `/api/v1`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/render", render_router())
        .nest("/publish", publish_router())
        .nest("/invalidate", invalidate_router())
        .nest("/pages", pages_router())
        .nest("/cache", cache_router())
}

/// Create the complete router.
///
/// - Public HTML: `/{area_slug}/{service_slug}` and `/p/{slug}`
/// - JSON API under `/api/v1/*`
/// - Health checks at `/health/*`
/// - Metrics at `/metrics`
/// - OpenAPI spec at `/openapi.json` (feature `openapi`)
/// - Swagger UI at `/swagger-ui` (feature `swagger-ui`)
///
/// Middleware, outermost first: CORS, trace, compression, concurrency
/// limit, observability. Fails when the configuration is not fit for
/// production.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> ApiResult<Router> {
    config.validate()?;

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api/v1", api_routes())
        .nest("/health", health_router())
        .nest("/p", static_page_router())
        .merge(page_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        // SwaggerUi serves its own copy; `/openapi.json` is already routed.
        router = router.merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }

    // CORS is applied as its own (outermost) router layer: `Cors` requires a
    // `Default` response body, which axum's `Body` provides after the inner
    // stack's responses are converted by `Router::layer`.
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(from_fn(observability_middleware));

    Ok(router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware)
        .layer(build_cors_layer(config))
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pagewright_storage::MemoryCacheStore;
    use pagewright_test_utils::fixtures::seeded_store;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::RenderConfig;

    fn test_router() -> Result<Router, String> {
        let scenario = seeded_store();
        let state = AppState::new(
            Arc::new(scenario.store),
            Arc::new(MemoryCacheStore::default()),
            RenderConfig::default(),
        );
        create_api_router(state, &ApiConfig::default()).map_err(|e| e.to_string())
    }

    #[test]
    fn test_production_requires_cors_origins() {
        let scenario = seeded_store();
        let state = AppState::new(
            Arc::new(scenario.store),
            Arc::new(MemoryCacheStore::default()),
            RenderConfig::default(),
        );
        let config = ApiConfig {
            environment: "production".to_string(),
            ..ApiConfig::default()
        };
        assert!(create_api_router(state, &config).is_err());
    }

    #[tokio::test]
    async fn test_health_ping() -> Result<(), String> {
        let response = test_router()?
            .oneshot(
                Request::get("/health/ping")
                    .body(Body::empty())
                    .map_err(|e| e.to_string())?,
            )
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(&body[..], b"pong");
        Ok(())
    }

    #[tokio::test]
    async fn test_health_ready_reports_components() -> Result<(), String> {
        let response = test_router()?
            .oneshot(
                Request::get("/health/ready")
                    .body(Body::empty())
                    .map_err(|e| e.to_string())?,
            )
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["details"]["content_store"]["status"], "healthy");
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_mounted() -> Result<(), String> {
        let response = test_router()?
            .oneshot(
                Request::get("/metrics")
                    .body(Body::empty())
                    .map_err(|e| e.to_string())?,
            )
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
