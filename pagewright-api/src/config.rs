//! API Configuration Module
//!
//! Configuration for the HTTP surface and the render pipeline, loaded from
//! environment variables with development-friendly defaults.

use std::time::Duration;

use crate::constants::{
    DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_PAGE_MAX_AGE_SECS,
    DEFAULT_REGENERATION_BATCH_SIZE, DEFAULT_SITE_BASE_URL,
};
use crate::error::{ApiError, ApiResult};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP-level settings: CORS and deployment environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    /// Entries may use a leading `*.` wildcard for subdomains.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deployment environment (`development`, `staging`, `production`).
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `PAGEWRIGHT_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `PAGEWRIGHT_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `PAGEWRIGHT_ENVIRONMENT`: deployment environment (default: development)
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cors_origins = lookup("PAGEWRIGHT_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = lookup("PAGEWRIGHT_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let environment = lookup("PAGEWRIGHT_ENVIRONMENT")
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.environment);

        Self {
            cors_origins,
            cors_max_age_secs,
            environment,
        }
    }

    /// True when deployed as production.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Production deployments must pin their CORS origins.
    pub fn validate(&self) -> ApiResult<()> {
        if self.is_production() && self.cors_origins.is_empty() {
            return Err(ApiError::invalid_input(
                "PAGEWRIGHT_CORS_ORIGINS must be set when PAGEWRIGHT_ENVIRONMENT=production",
            ));
        }
        Ok(())
    }

    /// Check whether a browser origin may call the API.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| {
            if let Some(suffix) = allowed.strip_prefix("*.") {
                origin
                    .split_once("://")
                    .map(|(_, host)| host.ends_with(&format!(".{}", suffix)))
                    .unwrap_or(false)
            } else {
                allowed == origin
            }
        })
    }
}

// ============================================================================
// RENDER CONFIGURATION
// ============================================================================

/// Settings for the render, publish and regeneration pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Prefix for canonical URLs, without a trailing slash.
    pub site_base_url: String,
    /// Bound on every store operation a render, publish or admin call makes.
    pub fetch_timeout: Duration,
    /// `Cache-Control` max-age for HTML responses.
    pub page_max_age_secs: u64,
    /// Allow at most one regeneration per URL path at a time.
    pub dedup_regeneration: bool,
    /// Default page count for one bulk regeneration call.
    pub regeneration_batch_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            page_max_age_secs: DEFAULT_PAGE_MAX_AGE_SECS,
            dedup_regeneration: true,
            regeneration_batch_size: DEFAULT_REGENERATION_BATCH_SIZE,
        }
    }
}

impl RenderConfig {
    /// Create RenderConfig from environment variables.
    ///
    /// - `PAGEWRIGHT_SITE_BASE_URL` (default: http://localhost:3000)
    /// - `PAGEWRIGHT_FETCH_TIMEOUT_MS` (default: 2000)
    /// - `PAGEWRIGHT_PAGE_MAX_AGE_SECS` (default: 3600)
    /// - `PAGEWRIGHT_DEDUP_REGENERATION` (default: true)
    /// - `PAGEWRIGHT_REGENERATION_BATCH_SIZE` (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let site_base_url = lookup("PAGEWRIGHT_SITE_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.site_base_url);

        let fetch_timeout = lookup("PAGEWRIGHT_FETCH_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.fetch_timeout);

        let page_max_age_secs = lookup("PAGEWRIGHT_PAGE_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.page_max_age_secs);

        let dedup_regeneration = lookup("PAGEWRIGHT_DEDUP_REGENERATION")
            .and_then(|s| parse_bool(&s))
            .unwrap_or(defaults.dedup_regeneration);

        let regeneration_batch_size = lookup("PAGEWRIGHT_REGENERATION_BATCH_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.regeneration_batch_size);

        Self {
            site_base_url,
            fetch_timeout,
            page_max_age_secs,
            dedup_regeneration,
            regeneration_batch_size,
        }
    }

    /// `Cache-Control` header value for HTML page responses.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.page_max_age_secs)
    }
}
