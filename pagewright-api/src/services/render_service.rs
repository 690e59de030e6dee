//! Render Pipeline
//!
//! Serves one generated page per request:
//!
//! LOOKUP -> (HIT | STALE) -> ASSEMBLE -> COMPILE -> PERSIST -> SERVE -> TELEMETRY
//!
//! A persisted render is served only while its staleness flag is clear.
//! Otherwise the page is recomputed; when recomputation cannot gather its
//! inputs or the template is malformed, the previous artifact is served
//! instead. At most one regeneration per URL path runs at a time unless
//! de-duplication is switched off. A render that an invalidation overtook
//! is persisted but leaves the page flagged.

use chrono::Utc;
use dashmap::DashMap;
use pagewright_core::{
    content_hash_hex, EntityType, GeneratedPage, PagewrightError, StorageError, TemplateError,
};
use pagewright_storage::{get_json, set_json, CacheBackend, CacheKey, ContentStore};
use pagewright_template::{compile, CompiledTemplate};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RenderConfig;
use crate::error::ApiError;
use crate::services::assembler::PageDataAssembler;
use crate::services::shell::{self, PageMeta};
use crate::telemetry::metrics;

// ============================================================================
// ERRORS
// ============================================================================

/// Why a render produced no page.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("No generated page at {path}")]
    NotFound { path: String },

    #[error("Generated page at {path} is disabled")]
    Disabled { path: String },

    #[error("Could not gather page data for {path}: {source}")]
    Upstream {
        path: String,
        source: PagewrightError,
    },

    #[error("Template for {path} is malformed: {source}")]
    Compile {
        path: String,
        source: TemplateError,
    },
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            // Disabled pages are indistinguishable from missing ones.
            RenderError::NotFound { path } | RenderError::Disabled { path } => {
                ApiError::page_not_found(&path)
            }
            RenderError::Upstream { source, .. } => ApiError::from_upstream(source),
            RenderError::Compile { source, .. } => ApiError::compile_failed(source.to_string()),
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// How the served HTML was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Persisted render, flag clear.
    Hit,
    /// Recomputed and persisted.
    Regenerated,
    /// Recomputation failed; the previous artifact was served.
    Degraded,
    /// Recomputed but the write failed; the page stays flagged.
    Unpersisted,
    /// Recomputed and persisted, but invalidated meanwhile; the page stays
    /// flagged.
    Superseded,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Hit => "hit",
            RenderStatus::Regenerated => "regenerated",
            RenderStatus::Degraded => "degraded",
            RenderStatus::Unpersisted => "unpersisted",
            RenderStatus::Superseded => "superseded",
        }
    }
}

/// One served page.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub path: String,
    pub status: RenderStatus,
    /// Full document.
    pub html: String,
    /// Content fragment inside the page shell.
    pub content: String,
    pub page_data: PageMeta,
    /// Hex SHA-256 of `html`.
    pub etag: String,
}

/// A freshly composed render, not yet persisted.
#[derive(Debug, Clone)]
pub(crate) struct ComposedPage {
    pub html: String,
    pub content: String,
    pub meta: PageMeta,
    pub etag: String,
}

/// Fragment cached under `pages:{path}` so API callers skip re-parsing the
/// persisted document. Only valid while `content_hash` matches the page's.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFragment {
    content: String,
    page_data: PageMeta,
    content_hash: String,
}

/// Apply a compiled template and wrap the result in the page shell.
pub(crate) fn compose_page(
    compiled: &CompiledTemplate,
    bag: &pagewright_core::DataBag,
) -> ComposedPage {
    let content = compiled.apply(bag);
    let meta = PageMeta::from_bag(bag);
    let html = shell::wrap(&content, &meta);
    let etag = content_hash_hex(html.as_bytes());
    ComposedPage {
        html,
        content,
        meta,
        etag,
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct RenderPipeline {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheBackend>,
    assembler: PageDataAssembler,
    config: RenderConfig,
    /// One mutex per path currently regenerating.
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl RenderPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn CacheBackend>,
        config: RenderConfig,
    ) -> Self {
        let assembler = PageDataAssembler::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            config.fetch_timeout,
            config.site_base_url.clone(),
        );
        Self {
            store,
            cache,
            assembler,
            config,
            in_flight: DashMap::new(),
        }
    }

    pub fn assembler(&self) -> &PageDataAssembler {
        &self.assembler
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Number of paths with a regeneration in progress.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Render the page at `path`.
    ///
    /// Every served page schedules a view-count update that never affects
    /// the response.
    pub async fn render(&self, path: &str) -> Result<RenderOutcome, RenderError> {
        let result = self.render_page(path).await;

        let label = match &result {
            Ok(outcome) => outcome.status.as_str(),
            Err(RenderError::NotFound { .. } | RenderError::Disabled { .. }) => "not_found",
            Err(_) => "failed",
        };
        if let Some(m) = metrics() {
            m.record_render(label);
        }

        match &result {
            Ok(outcome) => {
                tracing::debug!(path = %path, status = outcome.status.as_str(), "Page served");
                self.record_view(path);
            }
            Err(e) => tracing::debug!(path = %path, error = %e, "Page not served"),
        }
        result
    }

    async fn render_page(&self, path: &str) -> Result<RenderOutcome, RenderError> {
        let page = self.lookup(path).await?;
        if let Some(html) = page.trusted_html() {
            return Ok(self.serve_persisted(&page, html, RenderStatus::Hit).await);
        }
        self.with_path_slot(path, || self.render_exclusive(path))
            .await
    }

    /// Run `work` while holding the regeneration slot for `path`. Runs it
    /// directly when de-duplication is off.
    pub(crate) async fn with_path_slot<T, F, Fut>(&self, path: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.config.dedup_regeneration {
            return work().await;
        }

        let slot = self.in_flight.entry(path.to_string()).or_default().value().clone();
        let result = {
            let _guard = slot.lock().await;
            work().await
        };
        drop(slot);
        self.in_flight
            .remove_if(path, |_, slot| Arc::strong_count(slot) == 1);
        result
    }

    /// Regenerate under the path's slot. A waiter re-reads the record once it
    /// holds the slot and serves the holder's render when the flag cleared.
    async fn render_exclusive(&self, path: &str) -> Result<RenderOutcome, RenderError> {
        let page = self.lookup(path).await?;
        match page.trusted_html() {
            Some(html) => Ok(self.serve_persisted(&page, html, RenderStatus::Hit).await),
            None => self.regenerate(&page).await,
        }
    }

    async fn lookup(&self, path: &str) -> Result<GeneratedPage, RenderError> {
        let page = self
            .assembler
            .bounded(path, self.store.page_get_by_path(path))
            .await
            .map_err(|source| RenderError::Upstream {
                path: path.to_string(),
                source,
            })?
            .ok_or_else(|| RenderError::NotFound {
                path: path.to_string(),
            })?;
        if !page.enabled {
            return Err(RenderError::Disabled {
                path: path.to_string(),
            });
        }
        Ok(page)
    }

    // ========================================================================
    // REGENERATION
    // ========================================================================

    async fn regenerate(&self, page: &GeneratedPage) -> Result<RenderOutcome, RenderError> {
        match self.compose(page).await {
            Ok(composed) => Ok(self.persist(page, composed).await),
            Err(err) => self.degrade(page, err).await,
        }
    }

    async fn compose(&self, page: &GeneratedPage) -> Result<ComposedPage, RenderError> {
        let upstream = |source: PagewrightError| RenderError::Upstream {
            path: page.url_path.clone(),
            source,
        };

        let inputs = self.assembler.assemble(page).await.map_err(upstream)?;
        let template_id = inputs.template_id(page).ok_or_else(|| {
            upstream(StorageError::not_found(EntityType::Template, "<unassigned>").into())
        })?;
        let template = self
            .assembler
            .template(template_id)
            .await
            .map_err(upstream)?
            .ok_or_else(|| upstream(StorageError::not_found(EntityType::Template, template_id).into()))?;

        let compiled = compile(&template.html).map_err(|source| RenderError::Compile {
            path: page.url_path.clone(),
            source,
        })?;
        Ok(compose_page(&compiled, &inputs.bag))
    }

    /// Write a composed render. A failed write still serves the fresh HTML
    /// and leaves the staleness flag set for the next request. The flag is
    /// only cleared when no invalidation arrived since `page` was read.
    pub(crate) async fn persist(&self, page: &GeneratedPage, composed: ComposedPage) -> RenderOutcome {
        let saved = self
            .assembler
            .bounded(
                &page.url_path,
                self.store.page_save_render(
                    &page.url_path,
                    &composed.html,
                    &composed.etag,
                    Utc::now(),
                    page.stale_generation,
                ),
            )
            .await;

        let status = match saved {
            Ok(cleared) => {
                self.cache_fragment(&page.url_path, &composed.content, &composed.meta, &composed.etag)
                    .await;
                if cleared {
                    RenderStatus::Regenerated
                } else {
                    tracing::debug!(path = %page.url_path, "Page invalidated during render, stays stale");
                    RenderStatus::Superseded
                }
            }
            Err(e) => {
                tracing::warn!(path = %page.url_path, error = %e, "Render not persisted, page stays stale");
                RenderStatus::Unpersisted
            }
        };

        RenderOutcome {
            path: page.url_path.clone(),
            status,
            html: composed.html,
            content: composed.content,
            page_data: composed.meta,
            etag: composed.etag,
        }
    }

    async fn degrade(
        &self,
        page: &GeneratedPage,
        err: RenderError,
    ) -> Result<RenderOutcome, RenderError> {
        match page.last_known_html() {
            Some(html) => {
                tracing::warn!(path = %page.url_path, error = %err, "Regeneration failed, serving previous render");
                Ok(self.serve_persisted(page, html, RenderStatus::Degraded).await)
            }
            None => {
                tracing::error!(path = %page.url_path, error = %err, "Regeneration failed with no previous render");
                Err(err)
            }
        }
    }

    // ========================================================================
    // SERVING PERSISTED RENDERS
    // ========================================================================

    async fn serve_persisted(
        &self,
        page: &GeneratedPage,
        html: &str,
        status: RenderStatus,
    ) -> RenderOutcome {
        let etag = page
            .content_hash
            .clone()
            .unwrap_or_else(|| content_hash_hex(html.as_bytes()));

        let (content, page_data) = match self.cached_fragment(&page.url_path, &etag).await {
            Some(fragment) => (fragment.content, fragment.page_data),
            None => match shell::extract(html) {
                Some((content, meta)) => {
                    self.cache_fragment(&page.url_path, &content, &meta, &etag).await;
                    (content, meta)
                }
                // Hand-written document without the shell markers.
                None => (html.to_string(), PageMeta::default()),
            },
        };

        RenderOutcome {
            path: page.url_path.clone(),
            status,
            html: html.to_string(),
            content,
            page_data,
            etag,
        }
    }

    async fn cached_fragment(&self, path: &str, content_hash: &str) -> Option<CachedFragment> {
        match get_json::<CachedFragment, _>(self.cache.as_ref(), &CacheKey::page(path)).await {
            Ok(Some(fragment)) if fragment.content_hash == content_hash => {
                record_cache("get", "hit");
                Some(fragment)
            }
            Ok(_) => {
                record_cache("get", "miss");
                None
            }
            Err(e) => {
                record_cache("get", "error");
                tracing::warn!(path = %path, error = %e, "Fragment cache read failed");
                None
            }
        }
    }

    async fn cache_fragment(&self, path: &str, content: &str, meta: &PageMeta, content_hash: &str) {
        let fragment = CachedFragment {
            content: content.to_string(),
            page_data: meta.clone(),
            content_hash: content_hash.to_string(),
        };
        if let Err(e) = set_json(self.cache.as_ref(), &CacheKey::page(path), &fragment, None).await {
            record_cache("set", "error");
            tracing::warn!(path = %path, error = %e, "Fragment cache write failed");
        } else {
            record_cache("set", "ok");
        }
    }

    // ========================================================================
    // TELEMETRY
    // ========================================================================

    fn record_view(&self, path: &str) {
        let store = Arc::clone(&self.store);
        let path = path.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.page_record_view(&path, Utc::now()).await {
                tracing::warn!(path = %path, error = %e, "View telemetry failed");
            }
        });
    }
}

fn record_cache(op: &str, result: &str) {
    if let Some(m) = metrics() {
        m.record_cache_op(op, result);
    }
}
