//! PAGEWRIGHT API - HTTP Render and Publish Server
//!
//! Serves localized (service × area) landing pages compiled from templates,
//! publishes editable drafts into permanent documents, and keeps an
//! in-process cache coherent with upstream edits through invalidation
//! events. The generated page record's staleness flag is the source of
//! truth for whether a persisted render may be served.

pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, RenderConfig};
pub use error::{ApiError, ApiResult, ErrorCode, HtmlError};
pub use jobs::{cache_reaper_task, CacheReaperConfig};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use seed::SeedData;
pub use services::{
    InvalidationOutcome, InvalidationService, PageMeta, PageRegenerator, PublishError,
    PublishOutcome, PublishPipeline, RegenerationReport, RenderError, RenderOutcome,
    RenderPipeline, RenderStatus,
};
pub use state::AppState;
