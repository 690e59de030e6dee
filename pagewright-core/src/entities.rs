//! Core entity structures
//!
//! Records owned by the managed backend and consumed here only through their
//! shapes, plus the two records this engine writes: generated pages and the
//! published artifacts of static pages and services.

use crate::{EntityId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Company-wide business profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompanySettings {
    pub business_name: String,
    pub slogan: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub years_experience: Option<u32>,
    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub description: Option<String>,
}

/// Site-wide theming tokens, copied into the data bag verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SiteSettings {
    /// Color tokens, e.g. `primary -> #1d4ed8`.
    pub colors: BTreeMap<String, String>,
    /// Border-radius tokens, e.g. `card -> 12px`.
    pub radii: BTreeMap<String, String>,
    pub icon_stroke_width: Option<String>,
}

/// A service the business offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Service {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Starting price in cents.
    pub starting_price_cents: Option<i64>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub template_id: Option<EntityId>,
    /// Editable page draft with placeholders.
    pub html_draft: Option<String>,
    pub published_html: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub published_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// A city or region the business serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServiceArea {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub area_id: EntityId,
    pub city_name: String,
    pub slug: String,
    pub display_name: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl ServiceArea {
    /// Display name, falling back to the city name.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.city_name)
    }
}

/// Localized copy for one (service, area) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LocalOverride {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub area_id: EntityId,
    pub local_description: Option<String>,
    pub local_benefits: Vec<String>,
    pub response_time: Option<String>,
    pub completion_time: Option<String>,
    pub customer_count: Option<u64>,
    pub pricing_notes: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Reusable page template owned by one or more services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageTemplate {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub template_id: EntityId,
    pub name: String,
    /// Live markup compiled by the render pipeline.
    pub html: String,
    pub html_draft: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Persisted (service × area) page and its cached render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeneratedPage {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub page_id: EntityId,
    /// Unique URL path, `/{area_slug}/{service_slug}`.
    pub url_path: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub service_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub area_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub template_id: Option<EntityId>,
    pub rendered_html: Option<String>,
    pub needs_regeneration: bool,
    /// Bumped by every invalidation. A render clears `needs_regeneration`
    /// only while the generation it was started from is still current.
    #[serde(default)]
    pub stale_generation: u64,
    /// Page status flag; disabled pages are never rendered.
    pub enabled: bool,
    pub view_count: u64,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub last_viewed_at: Option<Timestamp>,
    /// Hex SHA-256 of `rendered_html`.
    pub content_hash: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl GeneratedPage {
    /// Create a freshly provisioned page. It has no render yet and is
    /// flagged for regeneration.
    pub fn new(
        url_path: impl Into<String>,
        service_id: EntityId,
        area_id: EntityId,
        template_id: Option<EntityId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            page_id: crate::new_entity_id(),
            url_path: url_path.into(),
            service_id,
            area_id,
            template_id,
            rendered_html: None,
            needs_regeneration: true,
            stale_generation: 0,
            enabled: true,
            view_count: 0,
            last_viewed_at: None,
            content_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the persisted render must be recomputed before serving.
    pub fn is_stale(&self) -> bool {
        self.needs_regeneration
            || self
                .rendered_html
                .as_deref()
                .map_or(true, |html| html.trim().is_empty())
    }

    /// The persisted render, only when it can be trusted.
    pub fn trusted_html(&self) -> Option<&str> {
        if self.is_stale() {
            None
        } else {
            self.rendered_html.as_deref()
        }
    }

    /// The persisted render regardless of the staleness flag. Only the
    /// degrade paths use this, after a regeneration attempt failed.
    pub fn last_known_html(&self) -> Option<&str> {
        self.rendered_html
            .as_deref()
            .filter(|html| !html.trim().is_empty())
    }
}

/// Build the canonical URL path for an (area, service) pair.
pub fn page_path(area_slug: &str, service_slug: &str) -> String {
    format!("/{}/{}", area_slug, service_slug)
}

/// Standalone marketing page with a draft and a published artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StaticPage {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub page_id: EntityId,
    pub slug: String,
    pub title: String,
    pub html_draft: Option<String>,
    pub published_html: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub published_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Kind of record a publish request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Static,
    Service,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Static => "static",
            PageType::Service => "service",
        }
    }
}

impl std::str::FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(PageType::Static),
            "service" => Ok(PageType::Service),
            other => Err(format!("unknown page type '{}'", other)),
        }
    }
}
