//! Prometheus Metrics Definitions
//!
//! Defines all PAGEWRIGHT metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<PagewrightMetrics>> = Lazy::new(PagewrightMetrics::new);

/// The registered metrics, or `None` when registration failed. Recording is
/// skipped in that case.
pub fn metrics() -> Option<&'static PagewrightMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all PAGEWRIGHT metrics.
#[derive(Clone)]
pub struct PagewrightMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Render pipeline outcomes - labels: outcome
    pub render_outcomes_total: CounterVec,

    /// Cache operations - labels: op, result
    pub cache_operations_total: CounterVec,

    /// Entries held by the cache store, refreshed by the reaper
    pub cache_entries: Gauge,

    /// Invalidation events applied - labels: subject
    pub invalidations_total: CounterVec,

    /// Publish attempts - labels: page_type, status
    pub publishes_total: CounterVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl PagewrightMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "pagewright_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "pagewright_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            render_outcomes_total: register_counter_vec!(
                "pagewright_render_outcomes_total",
                "Render pipeline outcomes",
                &["outcome"]
            )
            .map_err(|e| registration_error("render_outcomes_total", e))?,

            cache_operations_total: register_counter_vec!(
                "pagewright_cache_operations_total",
                "Cache store operations",
                &["op", "result"]
            )
            .map_err(|e| registration_error("cache_operations_total", e))?,

            cache_entries: register_gauge!(
                "pagewright_cache_entries",
                "Entries currently held by the cache store"
            )
            .map_err(|e| registration_error("cache_entries", e))?,

            invalidations_total: register_counter_vec!(
                "pagewright_invalidations_total",
                "Invalidation events applied",
                &["subject"]
            )
            .map_err(|e| registration_error("invalidations_total", e))?,

            publishes_total: register_counter_vec!(
                "pagewright_publishes_total",
                "Publish attempts",
                &["page_type", "status"]
            )
            .map_err(|e| registration_error("publishes_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one render outcome (`hit`, `regenerated`, `degraded`,
    /// `unpersisted`, `superseded`, `not_found`, `failed`).
    pub fn record_render(&self, outcome: &str) {
        self.render_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a cache operation, e.g. (`get`, `hit`).
    pub fn record_cache_op(&self, op: &str, result: &str) {
        self.cache_operations_total
            .with_label_values(&[op, result])
            .inc();
    }

    /// Set the cache entry gauge.
    pub fn set_cache_entries(&self, count: usize) {
        self.cache_entries.set(count as f64);
    }

    /// Record an applied invalidation event.
    pub fn record_invalidation(&self, subject: &str) {
        self.invalidations_total
            .with_label_values(&[subject])
            .inc();
    }

    /// Record a publish attempt.
    pub fn record_publish(&self, page_type: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.publishes_total
            .with_label_values(&[page_type, status])
            .inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so an idle process still exports its metric families.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_render_outcomes() -> Result<(), String> {
        let metrics = metrics().ok_or("metrics not registered")?;
        let before = metrics
            .render_outcomes_total
            .with_label_values(&["degraded"])
            .get();
        metrics.record_render("degraded");
        let after = metrics
            .render_outcomes_total
            .with_label_values(&["degraded"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_cache_gauge() -> Result<(), String> {
        let metrics = metrics().ok_or("metrics not registered")?;
        metrics.set_cache_entries(42);
        metrics.record_cache_op("get", "hit");
        metrics.record_invalidation("service");
        metrics.record_publish("static", true);
        metrics.record_http_request("GET", "/:area_slug/:service_slug", 200, 0.004);
        Ok(())
    }
}
