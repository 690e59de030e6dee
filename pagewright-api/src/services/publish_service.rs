//! Publish Pipeline
//!
//! Turns an editable draft into a permanent document. Drafts carry their own
//! HTML shell, so the pipeline only resolves placeholders once and injects
//! the behavior script before persisting. Published artifacts have no TTL
//! and are never regenerated automatically.

use chrono::Utc;
use pagewright_core::{
    DataBag, EntityId, PageType, PagewrightError, Service, Timestamp, TemplateError,
};
use pagewright_storage::{get_json, set_json, CacheBackend, CacheKey, ContentStore, InvalidationEvent};
use pagewright_template::{compile, inject_behavior_script};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{ApiError, ErrorCode};
use crate::services::assembler::PageDataAssembler;
use crate::services::invalidation_service::InvalidationService;
use crate::telemetry::metrics;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid page id '{0}'")]
    InvalidPageId(String),

    #[error("Invalid page type '{0}', expected 'static' or 'service'")]
    InvalidPageType(String),

    #[error("{kind} page {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} page {id} has no draft to publish")]
    NoDraft { kind: &'static str, id: String },

    #[error("Draft for {id} is malformed: {source}")]
    Compile { id: String, source: TemplateError },

    #[error("Could not gather data for {id}: {source}")]
    Upstream { id: String, source: PagewrightError },

    #[error("Could not persist published page {id}: {source}")]
    Persistence { id: String, source: PagewrightError },
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::MissingArgument(field) => ApiError::missing_field(field),
            PublishError::InvalidPageId(_) => ApiError::invalid_format("pageId", "UUID"),
            e @ PublishError::InvalidPageType(_) => ApiError::invalid_input(e.to_string()),
            PublishError::NotFound { kind: "static", id } => ApiError::new(
                ErrorCode::StaticPageNotFound,
                format!("Static page {} not found", id),
            ),
            PublishError::NotFound { kind, id } => ApiError::entity_not_found(kind, id),
            e @ PublishError::NoDraft { .. } => ApiError::template_not_found(e.to_string()),
            PublishError::Compile { source, .. } => ApiError::compile_failed(source.to_string()),
            PublishError::Upstream { source, .. } => ApiError::from_upstream(source),
            PublishError::Persistence { id, source } => {
                tracing::error!(id = %id, error = %source, "Publish not persisted");
                ApiError::persistence_failed(ErrorCode::PersistenceFailed.default_message())
            }
        }
    }
}

/// Parse the raw `pageId`/`pageType` pair of a publish request.
pub fn parse_target(
    page_id: Option<&str>,
    page_type: Option<&str>,
) -> Result<(EntityId, PageType), PublishError> {
    let page_id = page_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(PublishError::MissingArgument("pageId"))?;
    let page_type = page_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(PublishError::MissingArgument("pageType"))?;

    let id = page_id
        .parse::<EntityId>()
        .map_err(|_| PublishError::InvalidPageId(page_id.to_string()))?;
    let kind = page_type
        .parse::<PageType>()
        .map_err(|_| PublishError::InvalidPageType(page_type.to_string()))?;
    Ok((id, kind))
}

/// Result of one successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub page_id: EntityId,
    pub page_type: PageType,
    pub published_at: Timestamp,
    pub html: String,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct PublishPipeline {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheBackend>,
    assembler: PageDataAssembler,
    invalidation: InvalidationService,
}

impl PublishPipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn CacheBackend>,
        assembler: PageDataAssembler,
        invalidation: InvalidationService,
    ) -> Self {
        Self {
            store,
            cache,
            assembler,
            invalidation,
        }
    }

    pub async fn publish(
        &self,
        page_id: EntityId,
        page_type: PageType,
    ) -> Result<PublishOutcome, PublishError> {
        let result = match page_type {
            PageType::Static => self.publish_static(page_id).await,
            PageType::Service => self.publish_service(page_id).await,
        };

        if let Some(m) = metrics() {
            m.record_publish(page_type.as_str(), result.is_ok());
        }
        match &result {
            Ok(outcome) => tracing::info!(
                page_id = %page_id,
                page_type = page_type.as_str(),
                bytes = outcome.html.len(),
                "Page published"
            ),
            Err(e) => tracing::warn!(
                page_id = %page_id,
                page_type = page_type.as_str(),
                error = %e,
                "Publish failed"
            ),
        }
        result
    }

    async fn publish_static(&self, id: EntityId) -> Result<PublishOutcome, PublishError> {
        let upstream = |source| PublishError::Upstream {
            id: id.to_string(),
            source,
        };

        let page = self
            .assembler
            .bounded("static page fetch", self.store.static_page_get(id))
            .await
            .map_err(upstream)?
            .ok_or_else(|| PublishError::NotFound {
                kind: "static",
                id: id.to_string(),
            })?;
        let draft = non_empty(page.html_draft.as_deref()).ok_or_else(|| PublishError::NoDraft {
            kind: "static",
            id: id.to_string(),
        })?;

        let bag = self.assembler.site_bag().await.map_err(upstream)?;
        let html = resolve_draft(draft, &bag, id)?;

        let published_at = Utc::now();
        self.assembler
            .bounded(
                "static page publish",
                self.store.static_page_save_published(id, &html, published_at),
            )
            .await
            .map_err(|source| PublishError::Persistence {
                id: id.to_string(),
                source,
            })?;

        let event = InvalidationEvent::StaticPage {
            slug: page.slug.clone(),
        };
        if let Err(e) = self.invalidation.invalidate(&event).await {
            tracing::warn!(slug = %page.slug, error = %e, "Static page cache not invalidated");
        }

        Ok(PublishOutcome {
            page_id: id,
            page_type: PageType::Static,
            published_at,
            html,
        })
    }

    async fn publish_service(&self, id: EntityId) -> Result<PublishOutcome, PublishError> {
        let upstream = |source| PublishError::Upstream {
            id: id.to_string(),
            source,
        };

        let service = self
            .assembler
            .bounded("service fetch", self.store.service_get(id))
            .await
            .map_err(upstream)?
            .ok_or_else(|| PublishError::NotFound {
                kind: "service",
                id: id.to_string(),
            })?;
        let source = self.service_source(&service).await.map_err(upstream)?.ok_or_else(|| {
            PublishError::NoDraft {
                kind: "service",
                id: id.to_string(),
            }
        })?;

        let bag = self.assembler.service_bag(&service).await.map_err(upstream)?;
        let html = resolve_draft(&source, &bag, id)?;

        let published_at = Utc::now();
        self.assembler
            .bounded(
                "service publish",
                self.store.service_save_published(id, &html, published_at),
            )
            .await
            .map_err(|source| PublishError::Persistence {
                id: id.to_string(),
                source,
            })?;

        Ok(PublishOutcome {
            page_id: id,
            page_type: PageType::Service,
            published_at,
            html,
        })
    }

    /// The service's own draft, else its template's draft, else the
    /// template's live markup.
    async fn service_source(&self, service: &Service) -> Result<Option<String>, PagewrightError> {
        if let Some(draft) = non_empty(service.html_draft.as_deref()) {
            return Ok(Some(draft.to_string()));
        }
        let Some(template_id) = service.template_id else {
            return Ok(None);
        };
        let Some(template) = self
            .assembler
            .bounded("template fetch", self.store.template_get(template_id))
            .await?
        else {
            return Ok(None);
        };
        Ok(non_empty(template.html_draft.as_deref())
            .or_else(|| non_empty(Some(template.html.as_str())))
            .map(str::to_string))
    }

    /// Published document for a static page slug, read through the
    /// `page:static:{slug}` cache entry.
    pub async fn published_static_page(&self, slug: &str) -> Result<String, PublishError> {
        let key = CacheKey::static_page(slug);
        match get_json::<String, _>(self.cache.as_ref(), &key).await {
            Ok(Some(html)) => return Ok(html),
            Ok(None) => {}
            Err(e) => tracing::warn!(slug = %slug, error = %e, "Static page cache read failed"),
        }

        let not_found = || PublishError::NotFound {
            kind: "static",
            id: slug.to_string(),
        };
        let page = self
            .assembler
            .bounded("static page fetch", self.store.static_page_get_by_slug(slug))
            .await
            .map_err(|source| PublishError::Upstream {
                id: slug.to_string(),
                source,
            })?
            .ok_or_else(not_found)?;
        let html = page.published_html.ok_or_else(not_found)?;

        if let Err(e) = set_json(self.cache.as_ref(), &key, &html, None).await {
            tracing::warn!(slug = %slug, error = %e, "Static page cache write failed");
        }
        Ok(html)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Resolve every placeholder once and inject the behavior script.
fn resolve_draft(draft: &str, bag: &DataBag, id: EntityId) -> Result<String, PublishError> {
    let compiled = compile(draft).map_err(|source| PublishError::Compile {
        id: id.to_string(),
        source,
    })?;
    Ok(inject_behavior_script(&compiled.apply(bag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use pagewright_core::new_entity_id;
    use pagewright_storage::MemoryCacheStore;
    use pagewright_template::BEHAVIOR_MARKER;
    use pagewright_test_utils::fixtures::*;

    fn pipeline(scenario: &Scenario) -> (PublishPipeline, Arc<MemoryCacheStore>) {
        pipeline_with(scenario, RenderConfig::default())
    }

    fn pipeline_with(
        scenario: &Scenario,
        config: RenderConfig,
    ) -> (PublishPipeline, Arc<MemoryCacheStore>) {
        let store: Arc<dyn ContentStore> = Arc::new(scenario.store.clone());
        let cache = Arc::new(MemoryCacheStore::default());
        let assembler = PageDataAssembler::new(
            Arc::clone(&store),
            cache.clone(),
            config.fetch_timeout,
            config.site_base_url,
        );
        let invalidation = InvalidationService::new(Arc::clone(&store), cache.clone());
        (
            PublishPipeline::new(store, cache.clone(), assembler, invalidation),
            cache,
        )
    }

    #[test]
    fn test_parse_target() {
        let id = new_entity_id().to_string();
        assert!(matches!(
            parse_target(Some(&id), Some("static")),
            Ok((_, PageType::Static))
        ));
        assert!(matches!(
            parse_target(None, Some("static")),
            Err(PublishError::MissingArgument("pageId"))
        ));
        assert!(matches!(
            parse_target(Some(&id), Some("  ")),
            Err(PublishError::MissingArgument("pageType"))
        ));
        assert!(matches!(
            parse_target(Some("nope"), Some("static")),
            Err(PublishError::InvalidPageId(_))
        ));
        assert!(matches!(
            parse_target(Some(&id), Some("landing")),
            Err(PublishError::InvalidPageType(_))
        ));
    }

    #[test]
    fn test_error_status_mapping() {
        let missing: ApiError = PublishError::MissingArgument("pageId").into();
        assert_eq!(missing.code, ErrorCode::MissingField);
        let not_found: ApiError = PublishError::NotFound {
            kind: "static",
            id: "x".to_string(),
        }
        .into();
        assert_eq!(not_found.code, ErrorCode::StaticPageNotFound);
        let persistence: ApiError = PublishError::Persistence {
            id: "x".to_string(),
            source: pagewright_core::StorageError::LockPoisoned.into(),
        }
        .into();
        assert_eq!(persistence.code, ErrorCode::PersistenceFailed);
    }

    #[tokio::test]
    async fn test_publish_static_resolves_draft_once() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, _) = pipeline(&scenario);

        let outcome = pipeline
            .publish(scenario.about.page_id, PageType::Static)
            .await
            .map_err(|e| e.to_string())?;

        assert!(outcome.html.contains("<h1>About Acme Roofing</h1>"));
        assert!(outcome.html.contains("25 years serving New Orleans."));
        assert!(outcome.html.contains("color: #1d4ed8"));
        assert!(outcome.html.contains("Call (504) 555-0100"));
        assert!(!outcome.html.contains("{{"));
        assert_eq!(outcome.html.matches(BEHAVIOR_MARKER).count(), 1);

        let stored = pipeline
            .published_static_page("about")
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(stored, outcome.html);
        Ok(())
    }

    #[tokio::test]
    async fn test_republish_replaces_cached_static_page() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, cache) = pipeline(&scenario);
        pipeline
            .publish(scenario.about.page_id, PageType::Static)
            .await
            .map_err(|e| e.to_string())?;
        pipeline
            .published_static_page("about")
            .await
            .map_err(|e| e.to_string())?;
        assert!(cache
            .peek(&CacheKey::static_page("about"))
            .map_err(|e| e.to_string())?
            .is_some());

        let mut about = scenario.about.clone();
        about.html_draft = Some("<html><body><p>New copy for {{business_name}}</p></body></html>".to_string());
        scenario.store.put_static_page(about).map_err(|e| e.to_string())?;

        pipeline
            .publish(scenario.about.page_id, PageType::Static)
            .await
            .map_err(|e| e.to_string())?;
        let served = pipeline
            .published_static_page("about")
            .await
            .map_err(|e| e.to_string())?;
        assert!(served.contains("New copy for Acme Roofing"));
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_service_falls_back_to_template_markup() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, _) = pipeline(&scenario);

        let outcome = pipeline
            .publish(scenario.service.service_id, PageType::Service)
            .await
            .map_err(|e| e.to_string())?;
        assert!(outcome.html.contains("Starting at $1,500"));
        assert!(outcome.html.contains("Roof Repair in "));
        assert_eq!(outcome.page_type, PageType::Service);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_unknown_record_is_not_found() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, _) = pipeline(&scenario);
        let err = pipeline
            .publish(new_entity_id(), PageType::Static)
            .await
            .err()
            .ok_or("expected error")?;
        assert!(matches!(err, PublishError::NotFound { .. }));

        let err = pipeline
            .published_static_page("about")
            .await
            .err()
            .ok_or("unpublished page must not be served")?;
        assert_eq!(ApiError::from(err).code, ErrorCode::StaticPageNotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_persistence_failure() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, _) = pipeline(&scenario);
        scenario.store.set_fail_persistence(true);

        let err = pipeline
            .publish(scenario.about.page_id, PageType::Static)
            .await
            .err()
            .ok_or("expected error")?;
        assert!(matches!(err, PublishError::Persistence { .. }));
        assert_eq!(ApiError::from(err).code, ErrorCode::PersistenceFailed);
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_service_fetch_fails_publish() -> Result<(), String> {
        let scenario = seeded_store();
        let (pipeline, _) = pipeline_with(
            &scenario,
            RenderConfig {
                fetch_timeout: std::time::Duration::from_millis(20),
                ..RenderConfig::default()
            },
        );
        scenario.store.set_fetch_delay(std::time::Duration::from_millis(200));

        let err = pipeline
            .publish(scenario.service.service_id, PageType::Service)
            .await
            .err()
            .ok_or("expected timeout")?;
        assert!(matches!(
            err,
            PublishError::Upstream {
                source: PagewrightError::Storage(pagewright_core::StorageError::Timeout { .. }),
                ..
            }
        ));
        assert_eq!(ApiError::from(err).code, ErrorCode::UpstreamFetchFailed);

        let service = scenario
            .store
            .service_get(scenario.service.service_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("missing service")?;
        assert!(service.published_html.is_none());
        Ok(())
    }
}
