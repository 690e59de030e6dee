//! Error Types for PAGEWRIGHT API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementations for JSON and HTML callers
//!
//! JSON callers receive `{"error": "...", "code": "..."}` with the mapped
//! status. Browser-facing routes wrap the same error in [`HtmlError`] and get
//! a minimal HTML page instead.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use pagewright_core::{EntityType, PagewrightError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Required field is missing from request
    MissingField,

    /// Request contains invalid input data
    InvalidInput,

    /// Field format is incorrect
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// No generated page at the requested path, or the page is disabled
    PageNotFound,

    /// Template or draft source does not exist
    TemplateNotFound,

    /// Static page does not exist or is unpublished
    StaticPageNotFound,

    // ========================================================================
    // Server Errors (500, 504)
    // ========================================================================
    /// Company, service, area or template fetch failed
    UpstreamFetchFailed,

    /// Writing a rendered or published artifact failed
    PersistenceFailed,

    /// Template markup could not be compiled
    CompileFailed,

    /// Internal server error
    InternalError,

    /// Operation timed out
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::MissingField
            | ErrorCode::InvalidInput
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound
            | ErrorCode::PageNotFound
            | ErrorCode::TemplateNotFound
            | ErrorCode::StaticPageNotFound => StatusCode::NOT_FOUND,

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::UpstreamFetchFailed
            | ErrorCode::PersistenceFailed
            | ErrorCode::CompileFailed
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::PageNotFound => "Page not found",
            ErrorCode::TemplateNotFound => "Template not found",
            ErrorCode::StaticPageNotFound => "Page not found",
            ErrorCode::UpstreamFetchFailed => "Upstream record fetch failed",
            ErrorCode::PersistenceFailed => "Failed to persist artifact",
            ErrorCode::CompileFailed => "Template could not be compiled",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error naming the field.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Create an InvalidFormat error naming the field and expected format.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
        .with_details(serde_json::json!({ "field": field, "expected": expected }))
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn page_not_found(path: &str) -> Self {
        Self::new(ErrorCode::PageNotFound, format!("No page at {}", path))
    }

    pub fn template_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TemplateNotFound, message)
    }

    pub fn static_page_not_found(slug: &str) -> Self {
        Self::new(
            ErrorCode::StaticPageNotFound,
            format!("No published page '{}'", slug),
        )
    }

    pub fn upstream_fetch_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamFetchFailed, message)
    }

    pub fn persistence_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistenceFailed, message)
    }

    pub fn compile_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CompileFailed, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn timeout(operation: &str) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation '{}' timed out", operation),
        )
    }

    /// Error for a page whose source records could not be read. A timed-out
    /// read is an upstream failure here, not a gateway timeout.
    pub fn from_upstream(err: PagewrightError) -> Self {
        match err {
            PagewrightError::Storage(err @ StorageError::Timeout { .. }) => {
                tracing::error!(error = %err, "Upstream fetch timed out");
                ApiError::upstream_fetch_failed(ErrorCode::UpstreamFetchFailed.default_message())
            }
            other => ApiError::from(other),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

/// An [`ApiError`] rendered as a minimal HTML page, for browser routes.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlError(pub ApiError);

impl From<ApiError> for HtmlError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Html(error_page(status, &self.0))).into_response()
    }
}

/// Minimal error document. Server errors never echo internal messages.
pub fn error_page(status: StatusCode, err: &ApiError) -> String {
    let heading = status.canonical_reason().unwrap_or("Error");
    let message = if status.is_server_error() {
        "Something went wrong. Please try again shortly."
    } else {
        err.code.default_message()
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{code} {heading}</title></head>\n<body><h1>{code} {heading}</h1><p>{message}</p></body>\n</html>\n",
        code = status.as_u16(),
        heading = heading,
        message = message,
    )
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<PagewrightError> for ApiError {
    fn from(err: PagewrightError) -> Self {
        match err {
            PagewrightError::Storage(StorageError::NotFound { entity_type, id }) => {
                match entity_type {
                    EntityType::GeneratedPage => ApiError::page_not_found(&id),
                    EntityType::Template => ApiError::template_not_found(format!(
                        "Template with id {} not found",
                        id
                    )),
                    EntityType::StaticPage => ApiError::new(
                        ErrorCode::StaticPageNotFound,
                        format!("Static page with id {} not found", id),
                    ),
                    other => ApiError::entity_not_found(other.label(), id),
                }
            }
            PagewrightError::Storage(
                err @ (StorageError::InsertFailed { .. } | StorageError::UpdateFailed { .. }),
            ) => {
                tracing::error!(error = %err, "Persistence failed");
                ApiError::persistence_failed(ErrorCode::PersistenceFailed.default_message())
            }
            PagewrightError::Storage(err @ StorageError::FetchFailed { .. }) => {
                tracing::error!(error = %err, "Upstream fetch failed");
                ApiError::upstream_fetch_failed(ErrorCode::UpstreamFetchFailed.default_message())
            }
            PagewrightError::Storage(StorageError::Timeout { operation, .. }) => {
                ApiError::timeout(&operation)
            }
            PagewrightError::Storage(StorageError::LockPoisoned) => {
                tracing::error!("Storage lock poisoned");
                ApiError::from_code(ErrorCode::InternalError)
            }
            PagewrightError::Validation(ValidationError::RequiredFieldMissing { field }) => {
                ApiError::missing_field(&field)
            }
            PagewrightError::Validation(err @ ValidationError::InvalidValue { .. }) => {
                ApiError::validation_failed(err.to_string())
            }
            PagewrightError::Config(err) => {
                tracing::error!(error = %err, "Configuration error");
                ApiError::from_code(ErrorCode::InternalError)
            }
            PagewrightError::Template(err) => ApiError::compile_failed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::new(
            ErrorCode::InvalidFormat,
            format!("JSON serialization error: {}", err),
        )
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::new(ErrorCode::InvalidFormat, format!("Invalid id: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::TemplateError;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::MissingField.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PageNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::UpstreamFetchFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::PersistenceFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_api_error_wire_format() {
        let err = ApiError::page_not_found("/metairie/nope");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "No page at /metairie/nope");
        assert_eq!(json["code"], "PAGE_NOT_FOUND");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_missing_field_carries_details() {
        let err = ApiError::missing_field("pageId");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details, Some(serde_json::json!({ "field": "pageId" })));
    }

    #[test]
    fn test_not_found_conversion_by_entity() {
        let page: ApiError =
            PagewrightError::from(StorageError::not_found(EntityType::GeneratedPage, "/a/b"))
                .into();
        assert_eq!(page.code, ErrorCode::PageNotFound);

        let template: ApiError =
            PagewrightError::from(StorageError::not_found(EntityType::Template, "t1")).into();
        assert_eq!(template.code, ErrorCode::TemplateNotFound);

        let service: ApiError =
            PagewrightError::from(StorageError::not_found(EntityType::Service, "s1")).into();
        assert_eq!(service.code, ErrorCode::EntityNotFound);
        assert!(service.message.contains("s1"));
    }

    #[test]
    fn test_storage_failures_hide_internals() {
        let err: ApiError = PagewrightError::from(StorageError::UpdateFailed {
            entity_type: EntityType::StaticPage,
            id: "p1".to_string(),
            reason: "disk on fire".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::PersistenceFailed);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_upstream_timeout_is_a_fetch_failure() {
        let timeout = || {
            PagewrightError::from(StorageError::Timeout {
                operation: "service:abc".to_string(),
                timeout_ms: 2000,
            })
        };

        let upstream = ApiError::from_upstream(timeout());
        assert_eq!(upstream.code, ErrorCode::UpstreamFetchFailed);
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!upstream.message.contains("service:abc"));

        let other = ApiError::from(timeout());
        assert_eq!(other.code, ErrorCode::Timeout);

        let missing = ApiError::from_upstream(
            StorageError::not_found(EntityType::Service, "s1").into(),
        );
        assert_eq!(missing.code, ErrorCode::EntityNotFound);
    }

    #[test]
    fn test_template_error_conversion() {
        let err: ApiError = PagewrightError::from(TemplateError::UnclosedBlock {
            name: "items".to_string(),
            offset: 4,
        })
        .into();
        assert_eq!(err.code, ErrorCode::CompileFailed);
        assert!(err.message.contains("items"));
    }

    #[test]
    fn test_error_page_is_minimal_html() {
        let err = ApiError::page_not_found("/x/y");
        let html = error_page(StatusCode::NOT_FOUND, &err);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("404 Not Found"));

        let internal = ApiError::internal_error("secret detail");
        let html = error_page(StatusCode::INTERNAL_SERVER_ERROR, &internal);
        assert!(!html.contains("secret detail"));
    }

    #[test]
    fn test_html_error_response_status() {
        let response = HtmlError(ApiError::page_not_found("/x/y")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/html"));
    }
}
