//! In-memory content store.
//!
//! Tables are `Arc<RwLock<HashMap<..>>>` so clones share state. Failure
//! switches let tests drive the degrade paths of the render and publish
//! pipelines without a real backend.

use crate::{ContentStore, PageScope};
use ::async_trait::async_trait;
use chrono::Utc;
use pagewright_core::{
    CompanySettings, EntityId, EntityType, GeneratedPage, LocalOverride, PageTemplate,
    PagewrightError, PagewrightResult, Service, ServiceArea, SiteSettings, StaticPage,
    StorageError, Timestamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

type Table<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// In-memory [`ContentStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    company: Arc<RwLock<Option<CompanySettings>>>,
    site: Arc<RwLock<Option<SiteSettings>>>,
    services: Table<EntityId, Service>,
    areas: Table<EntityId, ServiceArea>,
    overrides: Table<(EntityId, EntityId), LocalOverride>,
    templates: Table<EntityId, PageTemplate>,
    /// Keyed by URL path.
    pages: Table<String, GeneratedPage>,
    static_pages: Table<EntityId, StaticPage>,
    faults: Arc<Faults>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_fetches: AtomicBool,
    fail_persistence: AtomicBool,
    fail_views: AtomicBool,
    fetch_delay_ms: AtomicU64,
    upstream_fetches: AtomicU64,
    render_saves: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // FAILURE INJECTION
    // ========================================================================

    /// Make every upstream fetch (settings, services, areas, overrides,
    /// templates) fail.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.faults.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make every render/publish write fail.
    pub fn set_fail_persistence(&self, fail: bool) {
        self.faults.fail_persistence.store(fail, Ordering::SeqCst);
    }

    /// Make view telemetry writes fail.
    pub fn set_fail_views(&self, fail: bool) {
        self.faults.fail_views.store(fail, Ordering::SeqCst);
    }

    /// Delay every upstream fetch. Zero disables the delay.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.faults
            .fetch_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of upstream fetches served so far.
    pub fn upstream_fetch_count(&self) -> u64 {
        self.faults.upstream_fetches.load(Ordering::SeqCst)
    }

    /// Number of successful `page_save_render` calls so far.
    pub fn render_save_count(&self) -> u64 {
        self.faults.render_saves.load(Ordering::SeqCst)
    }

    async fn upstream(&self, entity_type: EntityType) -> PagewrightResult<()> {
        let delay = self.faults.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.faults.fail_fetches.load(Ordering::SeqCst) {
            return Err(StorageError::FetchFailed {
                entity_type,
                reason: "upstream unavailable".to_string(),
            }
            .into());
        }
        self.faults.upstream_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_persistence(&self, entity_type: EntityType, id: &str) -> PagewrightResult<()> {
        if self.faults.fail_persistence.load(Ordering::SeqCst) {
            return Err(StorageError::UpdateFailed {
                entity_type,
                id: id.to_string(),
                reason: "write rejected".to_string(),
            }
            .into());
        }
        Ok(())
    }

    // ========================================================================
    // UPSERT HELPERS
    // ========================================================================

    pub fn put_company(&self, company: CompanySettings) -> PagewrightResult<()> {
        *write(&self.company)? = Some(company);
        Ok(())
    }

    pub fn put_site(&self, site: SiteSettings) -> PagewrightResult<()> {
        *write(&self.site)? = Some(site);
        Ok(())
    }

    pub fn put_service(&self, service: Service) -> PagewrightResult<()> {
        write(&self.services)?.insert(service.service_id, service);
        Ok(())
    }

    pub fn put_area(&self, area: ServiceArea) -> PagewrightResult<()> {
        write(&self.areas)?.insert(area.area_id, area);
        Ok(())
    }

    pub fn put_override(&self, local: LocalOverride) -> PagewrightResult<()> {
        write(&self.overrides)?.insert((local.service_id, local.area_id), local);
        Ok(())
    }

    pub fn put_template(&self, template: PageTemplate) -> PagewrightResult<()> {
        write(&self.templates)?.insert(template.template_id, template);
        Ok(())
    }

    /// Insert or replace a generated page, keyed by its path.
    pub fn put_page(&self, page: GeneratedPage) -> PagewrightResult<()> {
        write(&self.pages)?.insert(page.url_path.clone(), page);
        Ok(())
    }

    pub fn put_static_page(&self, page: StaticPage) -> PagewrightResult<()> {
        write(&self.static_pages)?.insert(page.page_id, page);
        Ok(())
    }

    /// Remove a service together with its overrides and generated pages.
    /// Returns the number of pages deleted.
    pub fn remove_service(&self, id: EntityId) -> PagewrightResult<usize> {
        write(&self.services)?.remove(&id);
        write(&self.overrides)?.retain(|(service_id, _), _| *service_id != id);
        let mut pages = write(&self.pages)?;
        let before = pages.len();
        pages.retain(|_, page| page.service_id != id);
        Ok(before - pages.len())
    }

    /// Remove an area together with its overrides and generated pages.
    /// Returns the number of pages deleted.
    pub fn remove_area(&self, id: EntityId) -> PagewrightResult<usize> {
        write(&self.areas)?.remove(&id);
        write(&self.overrides)?.retain(|(_, area_id), _| *area_id != id);
        let mut pages = write(&self.pages)?;
        let before = pages.len();
        pages.retain(|_, page| page.area_id != id);
        Ok(before - pages.len())
    }

    /// Enable or disable a generated page.
    pub fn set_page_enabled(&self, path: &str, enabled: bool) -> PagewrightResult<()> {
        let mut pages = write(&self.pages)?;
        let page = pages
            .get_mut(path)
            .ok_or_else(|| StorageError::not_found(EntityType::GeneratedPage, path))?;
        page.enabled = enabled;
        Ok(())
    }

    /// Synchronous snapshot of a page, bypassing failure injection.
    pub fn page_snapshot(&self, path: &str) -> PagewrightResult<Option<GeneratedPage>> {
        Ok(read(&self.pages)?.get(path).cloned())
    }

    pub fn page_count(&self) -> PagewrightResult<usize> {
        Ok(read(&self.pages)?.len())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn company_settings(&self) -> PagewrightResult<Option<CompanySettings>> {
        self.upstream(EntityType::CompanySettings).await?;
        Ok(read(&self.company)?.clone())
    }

    async fn site_settings(&self) -> PagewrightResult<Option<SiteSettings>> {
        self.upstream(EntityType::SiteSettings).await?;
        Ok(read(&self.site)?.clone())
    }

    async fn service_get(&self, id: EntityId) -> PagewrightResult<Option<Service>> {
        self.upstream(EntityType::Service).await?;
        Ok(read(&self.services)?.get(&id).cloned())
    }

    async fn service_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<Service>> {
        self.upstream(EntityType::Service).await?;
        Ok(read(&self.services)?
            .values()
            .find(|s| s.slug == slug)
            .cloned())
    }

    async fn area_get(&self, id: EntityId) -> PagewrightResult<Option<ServiceArea>> {
        self.upstream(EntityType::Area).await?;
        Ok(read(&self.areas)?.get(&id).cloned())
    }

    async fn area_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<ServiceArea>> {
        self.upstream(EntityType::Area).await?;
        Ok(read(&self.areas)?.values().find(|a| a.slug == slug).cloned())
    }

    async fn areas_list(&self) -> PagewrightResult<Vec<ServiceArea>> {
        self.upstream(EntityType::Area).await?;
        let mut areas: Vec<ServiceArea> = read(&self.areas)?.values().cloned().collect();
        areas.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(areas)
    }

    async fn local_override_get(
        &self,
        service_id: EntityId,
        area_id: EntityId,
    ) -> PagewrightResult<Option<LocalOverride>> {
        self.upstream(EntityType::LocalOverride).await?;
        Ok(read(&self.overrides)?.get(&(service_id, area_id)).cloned())
    }

    async fn template_get(&self, id: EntityId) -> PagewrightResult<Option<PageTemplate>> {
        self.upstream(EntityType::Template).await?;
        Ok(read(&self.templates)?.get(&id).cloned())
    }

    async fn page_get_by_path(&self, path: &str) -> PagewrightResult<Option<GeneratedPage>> {
        Ok(read(&self.pages)?.get(path).cloned())
    }

    async fn page_insert(&self, page: &GeneratedPage) -> PagewrightResult<()> {
        let mut pages = write(&self.pages)?;
        if pages.contains_key(&page.url_path) {
            return Err(PagewrightError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::GeneratedPage,
                reason: format!("path {} already exists", page.url_path),
            }));
        }
        pages.insert(page.url_path.clone(), page.clone());
        Ok(())
    }

    async fn pages_list_stale(&self, limit: usize) -> PagewrightResult<Vec<GeneratedPage>> {
        let mut stale: Vec<GeneratedPage> = read(&self.pages)?
            .values()
            .filter(|p| p.enabled && p.is_stale())
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.url_path.cmp(&b.url_path));
        stale.truncate(limit);
        Ok(stale)
    }

    async fn page_save_render(
        &self,
        path: &str,
        html: &str,
        content_hash: &str,
        rendered_at: Timestamp,
        expected_generation: u64,
    ) -> PagewrightResult<bool> {
        self.check_persistence(EntityType::GeneratedPage, path)?;
        let mut pages = write(&self.pages)?;
        let page = pages
            .get_mut(path)
            .ok_or_else(|| StorageError::not_found(EntityType::GeneratedPage, path))?;
        let current = page.stale_generation == expected_generation;
        page.rendered_html = Some(html.to_string());
        page.content_hash = Some(content_hash.to_string());
        if current {
            page.needs_regeneration = false;
        }
        page.updated_at = rendered_at;
        self.faults.render_saves.fetch_add(1, Ordering::SeqCst);
        Ok(current)
    }

    async fn pages_mark_stale(&self, scope: PageScope) -> PagewrightResult<u64> {
        let now = Utc::now();
        let mut flagged = 0;
        for page in write(&self.pages)?.values_mut() {
            if scope.matches(page) {
                page.needs_regeneration = true;
                page.stale_generation += 1;
                page.updated_at = now;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn page_record_view(&self, path: &str, viewed_at: Timestamp) -> PagewrightResult<u64> {
        if self.faults.fail_views.load(Ordering::SeqCst) {
            return Err(StorageError::UpdateFailed {
                entity_type: EntityType::GeneratedPage,
                id: path.to_string(),
                reason: "view counter unavailable".to_string(),
            }
            .into());
        }
        let mut pages = write(&self.pages)?;
        let page = pages
            .get_mut(path)
            .ok_or_else(|| StorageError::not_found(EntityType::GeneratedPage, path))?;
        page.view_count += 1;
        page.last_viewed_at = Some(viewed_at);
        Ok(page.view_count)
    }

    async fn static_page_get(&self, id: EntityId) -> PagewrightResult<Option<StaticPage>> {
        Ok(read(&self.static_pages)?.get(&id).cloned())
    }

    async fn static_page_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<StaticPage>> {
        Ok(read(&self.static_pages)?
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn static_page_save_published(
        &self,
        id: EntityId,
        html: &str,
        published_at: Timestamp,
    ) -> PagewrightResult<StaticPage> {
        self.check_persistence(EntityType::StaticPage, &id.to_string())?;
        let mut pages = write(&self.static_pages)?;
        let page = pages
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::StaticPage, id))?;
        page.published_html = Some(html.to_string());
        page.published_at = Some(published_at);
        page.updated_at = published_at;
        Ok(page.clone())
    }

    async fn service_save_published(
        &self,
        id: EntityId,
        html: &str,
        published_at: Timestamp,
    ) -> PagewrightResult<Service> {
        self.check_persistence(EntityType::Service, &id.to_string())?;
        let mut services = write(&self.services)?;
        let service = services
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(EntityType::Service, id))?;
        service.published_html = Some(html.to_string());
        service.published_at = Some(published_at);
        service.updated_at = published_at;
        Ok(service.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
