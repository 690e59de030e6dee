//! Shared defaults for the API layer.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default port when neither `PORT` nor `PAGEWRIGHT_API_PORT` is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Default CORS preflight cache (24 hours).
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

/// Largest JSON body accepted by the API routes.
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Upper bound on concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 1024;

// ============================================================================
// RENDERING
// ============================================================================

/// Canonical URL prefix used when none is configured.
pub const DEFAULT_SITE_BASE_URL: &str = "http://localhost:3000";

/// Upper bound on a single upstream record fetch.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 2000;

/// `Cache-Control: max-age` for rendered HTML pages.
pub const DEFAULT_PAGE_MAX_AGE_SECS: u64 = 3600;

/// Pages loaded per bulk regeneration call when the caller gives no limit.
pub const DEFAULT_REGENERATION_BATCH_SIZE: usize = 100;

/// Hard ceiling on a single bulk regeneration call.
pub const MAX_REGENERATION_BATCH_SIZE: usize = 1000;

// ============================================================================
// PAGE SHELL
// ============================================================================

/// Element id of the embedded page metadata script.
pub const PAGE_DATA_SCRIPT_ID: &str = "pagewright-page-data";

/// Marks the start of the compiled template inside a rendered page.
pub const CONTENT_START_MARKER: &str = "<!-- pagewright:content:start -->";

/// Marks the end of the compiled template inside a rendered page.
pub const CONTENT_END_MARKER: &str = "<!-- pagewright:content:end -->";

// ============================================================================
// BACKGROUND JOBS
// ============================================================================

/// How often the cache reaper sweeps expired entries.
pub const DEFAULT_CACHE_REAP_INTERVAL_SECS: u64 = 60;
