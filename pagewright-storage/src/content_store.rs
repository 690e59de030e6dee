//! Async content store trait over the managed backend.
//!
//! Every fetch returns `Ok(None)` for "no such row" and reserves `Err` for
//! genuine failures; callers that need a record use [`crate::require`].

use crate::PageScope;
use ::async_trait::async_trait;
use pagewright_core::{
    CompanySettings, EntityId, GeneratedPage, LocalOverride, PageTemplate, PagewrightResult,
    Service, ServiceArea, SiteSettings, StaticPage, Timestamp,
};

#[async_trait]
pub trait ContentStore: Send + Sync {
    // ========================================================================
    // SETTINGS
    // ========================================================================

    /// Company-wide business profile.
    async fn company_settings(&self) -> PagewrightResult<Option<CompanySettings>>;

    /// Site-wide theming tokens.
    async fn site_settings(&self) -> PagewrightResult<Option<SiteSettings>>;

    // ========================================================================
    // SERVICES AND AREAS
    // ========================================================================

    async fn service_get(&self, id: EntityId) -> PagewrightResult<Option<Service>>;

    async fn service_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<Service>>;

    async fn area_get(&self, id: EntityId) -> PagewrightResult<Option<ServiceArea>>;

    async fn area_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<ServiceArea>>;

    /// All service areas, ordered by slug.
    async fn areas_list(&self) -> PagewrightResult<Vec<ServiceArea>>;

    /// Localized copy for a (service, area) pair.
    async fn local_override_get(
        &self,
        service_id: EntityId,
        area_id: EntityId,
    ) -> PagewrightResult<Option<LocalOverride>>;

    async fn template_get(&self, id: EntityId) -> PagewrightResult<Option<PageTemplate>>;

    // ========================================================================
    // GENERATED PAGES
    // ========================================================================

    /// Look up a generated page by its unique URL path.
    async fn page_get_by_path(&self, path: &str) -> PagewrightResult<Option<GeneratedPage>>;

    /// Insert a new generated page. Fails when the path is taken.
    async fn page_insert(&self, page: &GeneratedPage) -> PagewrightResult<()>;

    /// Enabled pages that need regeneration, at most `limit`, ordered by path.
    async fn pages_list_stale(&self, limit: usize) -> PagewrightResult<Vec<GeneratedPage>>;

    /// Write a fresh render: sets `rendered_html`, `content_hash` and
    /// `updated_at` in one step. `needs_regeneration` is cleared only when
    /// the page's `stale_generation` still equals `expected_generation`;
    /// otherwise an invalidation landed mid-render and the flag stays up.
    /// Returns whether the flag was cleared.
    async fn page_save_render(
        &self,
        path: &str,
        html: &str,
        content_hash: &str,
        rendered_at: Timestamp,
        expected_generation: u64,
    ) -> PagewrightResult<bool>;

    /// Raise `needs_regeneration` and bump `stale_generation` on every page
    /// in scope. Returns the number of pages flagged.
    async fn pages_mark_stale(&self, scope: PageScope) -> PagewrightResult<u64>;

    /// Increment `view_count` and set `last_viewed_at`. Returns the new count.
    async fn page_record_view(&self, path: &str, viewed_at: Timestamp) -> PagewrightResult<u64>;

    // ========================================================================
    // PUBLISHED ARTIFACTS
    // ========================================================================

    async fn static_page_get(&self, id: EntityId) -> PagewrightResult<Option<StaticPage>>;

    async fn static_page_get_by_slug(&self, slug: &str) -> PagewrightResult<Option<StaticPage>>;

    /// Persist a static page's published document. Returns the updated record.
    async fn static_page_save_published(
        &self,
        id: EntityId,
        html: &str,
        published_at: Timestamp,
    ) -> PagewrightResult<StaticPage>;

    /// Persist a service's published document. Returns the updated record.
    async fn service_save_published(
        &self,
        id: EntityId,
        html: &str,
        published_at: Timestamp,
    ) -> PagewrightResult<Service>;
}
