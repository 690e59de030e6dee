//! OpenAPI document for the PAGEWRIGHT API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{cache, health, invalidate, pages, publish, render, static_page};
use crate::services::{InvalidationOutcome, PageMeta, RegenerationReport};
use crate::telemetry::metrics;

use pagewright_core::PageType;
use pagewright_storage::{CacheStats, InvalidationEvent, NamespaceStats};

/// OpenAPI document for PAGEWRIGHT API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PAGEWRIGHT API",
        version = "0.1.0",
        description = "Renders localized (service × area) landing pages from templates, publishes drafts and keeps the page cache coherent",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Render", description = "Generated service-area pages"),
        (name = "Publish", description = "Draft publishing and published static pages"),
        (name = "Cache", description = "Invalidation and cache administration"),
        (name = "Pages", description = "Page provisioning and bulk regeneration"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // === Render Routes ===
        render::render_page,
        render::render_json,

        // === Publish Routes ===
        publish::publish_page,
        static_page::serve_static_page,

        // === Cache Routes ===
        invalidate::invalidate,
        cache::cache_stats,
        cache::clear_cache,

        // === Page Routes ===
        pages::provision_pages,
        pages::regenerate_pages,

        // === Health Routes ===
        health::ping,
        health::liveness,
        health::readiness,

        // === Metrics ===
        metrics::metrics_handler,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode,

            // === Render Types ===
            render::RenderRequest, render::RenderResponse, PageMeta,

            // === Publish Types ===
            publish::PublishRequest, publish::PublishResponse, PageType,

            // === Cache Types ===
            InvalidationEvent, InvalidationOutcome, CacheStats, NamespaceStats,
            cache::ClearCacheResponse,

            // === Page Types ===
            pages::ProvisionRequest, pages::ProvisionResponse, pages::RegenerateRequest,
            RegenerationReport,

            // === Health Types ===
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,
        )
    )
)]
pub struct ApiDoc;
