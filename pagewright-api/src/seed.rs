//! Content seeding for the in-process content store.
//!
//! A single-node deployment has no managed backend to read from, so `main`
//! can load the records it needs from a JSON file named by
//! `PAGEWRIGHT_SEED_FILE`. Every top-level key is optional:
//!
//! ```json
//! {
//!   "company": { "business_name": "Acme Roofing", ... },
//!   "site": { "colors": {}, "radii": {}, "icon_stroke_width": null },
//!   "templates": [], "services": [], "areas": [],
//!   "overrides": [], "static_pages": []
//! }
//! ```

use pagewright_core::{
    CompanySettings, LocalOverride, PageTemplate, PagewrightResult, Service, ServiceArea,
    SiteSettings, StaticPage,
};
use pagewright_storage::MemoryContentStore;
use serde::Deserialize;
use std::path::Path;

use crate::error::{ApiError, ApiResult};
use crate::services::PageRegenerator;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub company: Option<CompanySettings>,
    pub site: Option<SiteSettings>,
    pub templates: Vec<PageTemplate>,
    pub services: Vec<Service>,
    pub areas: Vec<ServiceArea>,
    pub overrides: Vec<LocalOverride>,
    pub static_pages: Vec<StaticPage>,
}

impl SeedData {
    pub fn from_json(raw: &str) -> ApiResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> ApiResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApiError::invalid_input(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Write every record into the store. Later records with the same id
    /// replace earlier ones.
    pub fn apply(&self, store: &MemoryContentStore) -> PagewrightResult<()> {
        if let Some(company) = &self.company {
            store.put_company(company.clone())?;
        }
        if let Some(site) = &self.site {
            store.put_site(site.clone())?;
        }
        for template in &self.templates {
            store.put_template(template.clone())?;
        }
        for service in &self.services {
            store.put_service(service.clone())?;
        }
        for area in &self.areas {
            store.put_area(area.clone())?;
        }
        for local in &self.overrides {
            store.put_override(local.clone())?;
        }
        for page in &self.static_pages {
            store.put_static_page(page.clone())?;
        }

        tracing::info!(
            templates = self.templates.len(),
            services = self.services.len(),
            areas = self.areas.len(),
            overrides = self.overrides.len(),
            static_pages = self.static_pages.len(),
            "Content store seeded"
        );
        Ok(())
    }

    /// Create the generated page records for every seeded service. Returns
    /// the number of pages created.
    pub async fn provision(&self, regenerator: &PageRegenerator) -> PagewrightResult<usize> {
        let mut created = 0;
        for service in &self.services {
            created += regenerator
                .provision_service_pages(service.service_id)
                .await?
                .len();
        }
        Ok(created)
    }
}
