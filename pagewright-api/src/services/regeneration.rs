//! Page provisioning and bulk regeneration.
//!
//! Provisioning creates the (service × area) page records a new service
//! needs. Bulk regeneration works through stale pages ahead of traffic,
//! compiling each template once and applying it to every page that uses it.

use pagewright_core::{
    page_path, EntityId, EntityType, GeneratedPage, PagewrightError, PagewrightResult,
    StorageError,
};
use pagewright_storage::require;
use pagewright_template::{compile, CompiledTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::MAX_REGENERATION_BATCH_SIZE;
use crate::services::render_service::{compose_page, RenderPipeline, RenderStatus};

/// Summary of one bulk regeneration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    /// Paths rendered and persisted.
    pub regenerated: Vec<String>,
    /// Paths still stale after the run: not rendered, not persisted, or
    /// invalidated again while rendering.
    pub failed: Vec<String>,
}

pub struct PageRegenerator {
    pipeline: Arc<RenderPipeline>,
    batch_size: usize,
}

impl PageRegenerator {
    pub fn new(pipeline: Arc<RenderPipeline>) -> Self {
        let batch_size = pipeline.config().regeneration_batch_size;
        Self {
            pipeline,
            batch_size,
        }
    }

    /// Create a page for every area that lacks one for this service. New
    /// pages start flagged stale and render on first request. Existing pages
    /// are left alone.
    pub async fn provision_service_pages(&self, service_id: EntityId) -> PagewrightResult<Vec<String>> {
        let store = self.pipeline.store();
        let assembler = self.pipeline.assembler();
        let service = require(
            assembler.bounded("service fetch", store.service_get(service_id)).await?,
            EntityType::Service,
            service_id,
        )?;

        let mut created = Vec::new();
        for area in assembler.bounded("area list", store.areas_list()).await? {
            let path = page_path(&area.slug, &service.slug);
            if assembler
                .bounded(&path, store.page_get_by_path(&path))
                .await?
                .is_some()
            {
                continue;
            }
            let page = GeneratedPage::new(path.clone(), service.service_id, area.area_id, service.template_id);
            match assembler.bounded(&path, store.page_insert(&page)).await {
                Ok(()) => created.push(path),
                // Lost a race with another provisioner.
                Err(PagewrightError::Storage(StorageError::InsertFailed { .. })) => {
                    tracing::debug!(path = %path, "Page already provisioned");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(service_id = %service_id, created = created.len(), "Service pages provisioned");
        Ok(created)
    }

    /// Regenerate up to `limit` stale pages (the configured batch size when
    /// absent, never more than the hard maximum).
    pub async fn regenerate_stale(&self, limit: Option<usize>) -> PagewrightResult<RegenerationReport> {
        let limit = limit
            .unwrap_or(self.batch_size)
            .clamp(1, MAX_REGENERATION_BATCH_SIZE);
        let stale = self
            .pipeline
            .assembler()
            .bounded("stale page list", self.pipeline.store().pages_list_stale(limit))
            .await?;

        let mut report = RegenerationReport::default();
        let mut compiled: HashMap<EntityId, Option<CompiledTemplate>> = HashMap::new();

        for page in stale {
            let result = self
                .pipeline
                .with_path_slot(&page.url_path, || self.regenerate_one(&page.url_path, &mut compiled))
                .await;
            match result {
                Ok(true) => report.regenerated.push(page.url_path),
                Ok(false) => report.failed.push(page.url_path),
                Err(e) => {
                    tracing::warn!(path = %page.url_path, error = %e, "Bulk regeneration skipped page");
                    report.failed.push(page.url_path);
                }
            }
        }

        tracing::info!(
            regenerated = report.regenerated.len(),
            failed = report.failed.len(),
            "Bulk regeneration finished"
        );
        Ok(report)
    }

    /// Regenerate one page while holding its path slot. Returns whether the
    /// page is fresh afterwards.
    async fn regenerate_one(
        &self,
        path: &str,
        compiled: &mut HashMap<EntityId, Option<CompiledTemplate>>,
    ) -> PagewrightResult<bool> {
        let assembler = self.pipeline.assembler();
        // A request may have rendered the page while this run waited.
        let page = require(
            assembler
                .bounded(path, self.pipeline.store().page_get_by_path(path))
                .await?,
            EntityType::GeneratedPage,
            path,
        )?;
        if !page.enabled {
            return Ok(false);
        }
        if page.trusted_html().is_some() {
            return Ok(true);
        }

        let inputs = assembler.assemble(&page).await?;
        let template_id = inputs
            .template_id(&page)
            .ok_or_else(|| StorageError::not_found(EntityType::Template, "<unassigned>"))?;

        if !compiled.contains_key(&template_id) {
            let template = require(
                assembler.template(template_id).await?,
                EntityType::Template,
                template_id,
            )?;
            let parsed = match compile(&template.html) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::error!(template_id = %template_id, error = %e, "Template does not compile");
                    None
                }
            };
            compiled.insert(template_id, parsed);
        }

        let Some(Some(template)) = compiled.get(&template_id) else {
            return Ok(false);
        };
        let composed = compose_page(template, &inputs.bag);
        let outcome = self.pipeline.persist(&page, composed).await;
        Ok(outcome.status == RenderStatus::Regenerated)
    }
}
