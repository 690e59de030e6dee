//! PAGEWRIGHT Core - Entity Types
//!
//! Pure data structures shared by every other crate: the records consumed from
//! the managed backend, the data bag fed to the template compiler, money and
//! phone formatting, and the error taxonomy. No I/O lives here.

pub mod entities;
pub mod error;
pub mod format;
pub mod value;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use entities::*;
pub use error::{
    ConfigError, PagewrightError, PagewrightResult, StorageError, TemplateError, ValidationError,
};
pub use format::{format_cents, format_cents_amount, normalize_phone};
pub use value::{DataBag, Value};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash for rendered artifacts.
pub type ContentHash = [u8; 32];

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Hex form of a content hash, used for ETags and persisted page hashes.
pub fn content_hash_hex(content: &[u8]) -> String {
    hex::encode(compute_content_hash(content))
}

// ============================================================================
// ENTITY TYPE DISCRIMINATOR
// ============================================================================

/// Entity type discriminator for error reporting and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    CompanySettings,
    SiteSettings,
    Service,
    Area,
    LocalOverride,
    Template,
    GeneratedPage,
    StaticPage,
}

impl EntityType {
    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::CompanySettings => "Company settings",
            EntityType::SiteSettings => "Site settings",
            EntityType::Service => "Service",
            EntityType::Area => "Service area",
            EntityType::LocalOverride => "Local override",
            EntityType::Template => "Template",
            EntityType::GeneratedPage => "Generated page",
            EntityType::StaticPage => "Static page",
        }
    }
}
