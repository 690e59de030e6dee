//! Error types for PAGEWRIGHT operations

use crate::EntityType;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Fetch failed for {entity_type:?}: {reason}")]
    FetchFailed { entity_type: EntityType, reason: String },

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Shorthand for a not-found error keyed by any displayable id.
    pub fn not_found(entity_type: EntityType, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Template structure errors.
///
/// Missing data never produces one of these; only markup whose block tags
/// cannot be paired does.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Block '{name}' opened at byte {offset} is never closed")]
    UnclosedBlock { name: String, offset: usize },

    #[error("Closing tag '{name}' at byte {offset} has no matching open block")]
    UnexpectedClose { name: String, offset: usize },

    #[error("Block nesting exceeds {max} levels at byte {offset}")]
    NestingTooDeep { max: usize, offset: usize },
}

/// Master error type for all PAGEWRIGHT errors.
#[derive(Debug, Clone, Error)]
pub enum PagewrightError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

impl PagewrightError {
    /// True when the error means "the record does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, PagewrightError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for PAGEWRIGHT operations.
pub type PagewrightResult<T> = Result<T, PagewrightError>;

// =============================================================================
// TESTS
// =============================================================================
