//! Invalidation Service
//!
//! Applies a change event in two steps: evict the cache entries the policy
//! table names, then raise the staleness flag on every generated page the
//! event can affect. The flag is the source of truth; the cache sweep only
//! keeps this process from reading old inputs.

use pagewright_core::PagewrightResult;
use pagewright_storage::{apply_plan, plan_for, CacheBackend, ContentStore, InvalidationEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::telemetry::metrics;

/// What one invalidation removed and flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct InvalidationOutcome {
    pub keys_removed: u64,
    pub entries_removed: u64,
    pub pages_flagged: u64,
}

#[derive(Clone)]
pub struct InvalidationService {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheBackend>,
}

impl InvalidationService {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { store, cache }
    }

    pub async fn invalidate(&self, event: &InvalidationEvent) -> PagewrightResult<InvalidationOutcome> {
        let plan = plan_for(event);
        let report = apply_plan(&plan, self.cache.as_ref()).await?;

        let pages_flagged = match event.page_scope() {
            Some(scope) => self.store.pages_mark_stale(scope).await?,
            None => 0,
        };

        if let Some(m) = metrics() {
            m.record_invalidation(event.subject());
        }
        tracing::info!(
            subject = event.subject(),
            keys_removed = report.keys_removed,
            entries_removed = report.entries_removed,
            pages_flagged,
            "Cache invalidated"
        );

        Ok(InvalidationOutcome {
            keys_removed: report.keys_removed,
            entries_removed: report.entries_removed,
            pages_flagged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_storage::{set_json, CacheKey, MemoryCacheStore};
    use pagewright_test_utils::fixtures::*;

    async fn service_with_warm_cache(
        scenario: &Scenario,
    ) -> Result<(InvalidationService, Arc<MemoryCacheStore>), String> {
        let cache = Arc::new(MemoryCacheStore::default());
        let keys = [
            CacheKey::service(scenario.service.service_id),
            CacheKey::area(scenario.metairie.area_id),
            CacheKey::page(&scenario.metairie_path),
            CacheKey::page(&scenario.kenner_path),
            CacheKey::company(),
            CacheKey::static_page("about"),
        ];
        for key in &keys {
            set_json(cache.as_ref(), key, &"cached", None)
                .await
                .map_err(|e| e.to_string())?;
        }
        let service = InvalidationService::new(Arc::new(scenario.store.clone()), cache.clone());
        Ok((service, cache))
    }

    fn clear_flags(scenario: &Scenario) -> Result<(), String> {
        for path in [&scenario.metairie_path, &scenario.kenner_path] {
            let mut page = scenario
                .store
                .page_snapshot(path)
                .map_err(|e| e.to_string())?
                .ok_or("missing page")?;
            page.rendered_html = Some("<p>ok</p>".to_string());
            page.needs_regeneration = false;
            scenario.store.put_page(page).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_service_event_sweeps_pages_and_flags_its_pages() -> Result<(), String> {
        let scenario = seeded_store();
        clear_flags(&scenario)?;
        let (service, cache) = service_with_warm_cache(&scenario).await?;

        let outcome = service
            .invalidate(&InvalidationEvent::Service {
                id: Some(scenario.service.service_id),
            })
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(outcome.keys_removed, 1);
        assert_eq!(outcome.entries_removed, 2);
        assert_eq!(outcome.pages_flagged, 2);
        assert!(cache
            .peek(&CacheKey::page(&scenario.metairie_path))
            .map_err(|e| e.to_string())?
            .is_none());
        assert!(cache
            .peek(&CacheKey::company())
            .map_err(|e| e.to_string())?
            .is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_area_event_flags_only_that_area() -> Result<(), String> {
        let scenario = seeded_store();
        clear_flags(&scenario)?;
        let (service, _) = service_with_warm_cache(&scenario).await?;

        let outcome = service
            .invalidate(&InvalidationEvent::Area {
                id: Some(scenario.metairie.area_id),
            })
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(outcome.pages_flagged, 1);

        let kenner = scenario
            .store
            .page_snapshot(&scenario.kenner_path)
            .map_err(|e| e.to_string())?
            .ok_or("missing page")?;
        assert!(!kenner.needs_regeneration);
        Ok(())
    }

    #[tokio::test]
    async fn test_static_page_event_has_no_ripple() -> Result<(), String> {
        let scenario = seeded_store();
        clear_flags(&scenario)?;
        let (service, cache) = service_with_warm_cache(&scenario).await?;

        let outcome = service
            .invalidate(&InvalidationEvent::StaticPage {
                slug: "about".to_string(),
            })
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(
            outcome,
            InvalidationOutcome {
                keys_removed: 1,
                entries_removed: 0,
                pages_flagged: 0,
            }
        );
        assert_eq!(cache.len().await.map_err(|e| e.to_string())?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_company_event_flags_every_page() -> Result<(), String> {
        let scenario = seeded_store();
        clear_flags(&scenario)?;
        let (service, _) = service_with_warm_cache(&scenario).await?;

        let outcome = service
            .invalidate(&InvalidationEvent::Company)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(outcome.entries_removed, 3);
        assert_eq!(outcome.pages_flagged, 2);
        Ok(())
    }
}
