//! Invalidation policy: change events to cache evictions.
//!
//! | Subject            | Exact keys              | Namespaces swept          |
//! |--------------------|-------------------------|---------------------------|
//! | company            |                         | `company`, `pages`        |
//! | service (id)       | `service:{id}`          | `services`, `pages`       |
//! | area (id)          | `area:{id}`             | `areas`, `pages`          |
//! | template (id)      | `template:{id}`         | `pages`                   |
//! | template (no id)   |                         | `templates`, `template`, `pages` |
//! | static page (slug) | `page:static:{slug}`    |                           |
//! | site settings      |                         | `site`, `pages`           |
//!
//! A service or area event without an id also sweeps the singular namespace
//! (`service`, `area`), since the exact key cannot be named.

use super::namespace::CacheKey;
use super::traits::CacheBackend;
use crate::PageScope;
use pagewright_core::{EntityId, PagewrightResult};
use serde::{Deserialize, Serialize};

const PAGES: &str = "pages";

/// A transient change signal. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "subject", rename_all = "camelCase")]
pub enum InvalidationEvent {
    Company,
    Service {
        #[serde(default)]
        #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
        id: Option<EntityId>,
    },
    Area {
        #[serde(default)]
        #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
        id: Option<EntityId>,
    },
    Template {
        #[serde(default)]
        #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
        id: Option<EntityId>,
    },
    StaticPage {
        slug: String,
    },
    SiteSettings,
}

impl InvalidationEvent {
    /// Generated pages whose staleness flag this event must raise. Static
    /// pages feed nothing else, so they have no scope.
    pub fn page_scope(&self) -> Option<PageScope> {
        match self {
            InvalidationEvent::Company
            | InvalidationEvent::SiteSettings
            | InvalidationEvent::Template { id: None } => Some(PageScope::All),
            InvalidationEvent::Service { id: Some(id) } => Some(PageScope::Service(*id)),
            InvalidationEvent::Service { id: None } => Some(PageScope::All),
            InvalidationEvent::Area { id: Some(id) } => Some(PageScope::Area(*id)),
            InvalidationEvent::Area { id: None } => Some(PageScope::All),
            InvalidationEvent::Template { id: Some(id) } => Some(PageScope::Template(*id)),
            InvalidationEvent::StaticPage { .. } => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn subject(&self) -> &'static str {
        match self {
            InvalidationEvent::Company => "company",
            InvalidationEvent::Service { .. } => "service",
            InvalidationEvent::Area { .. } => "area",
            InvalidationEvent::Template { .. } => "template",
            InvalidationEvent::StaticPage { .. } => "staticPage",
            InvalidationEvent::SiteSettings => "siteSettings",
        }
    }
}

/// Keys and namespaces to evict, in order: exact keys first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationPlan {
    pub keys: Vec<String>,
    pub namespaces: Vec<String>,
}

impl InvalidationPlan {
    fn new(keys: Vec<String>, namespaces: &[&str]) -> Self {
        Self {
            keys,
            namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        }
    }

    /// True when the plan sweeps the rendered pages namespace.
    pub fn sweeps_pages(&self) -> bool {
        self.namespaces.iter().any(|ns| ns == PAGES)
    }
}

/// What an applied plan removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct InvalidationReport {
    /// Exact keys that existed and were removed.
    pub keys_removed: u64,
    /// Entries removed by namespace sweeps.
    pub entries_removed: u64,
}

/// Translate an event into evictions.
pub fn plan_for(event: &InvalidationEvent) -> InvalidationPlan {
    match event {
        InvalidationEvent::Company => InvalidationPlan::new(vec![], &["company", PAGES]),
        InvalidationEvent::Service { id: Some(id) } => {
            InvalidationPlan::new(vec![CacheKey::service(*id)], &["services", PAGES])
        }
        InvalidationEvent::Service { id: None } => {
            InvalidationPlan::new(vec![], &["service", "services", PAGES])
        }
        InvalidationEvent::Area { id: Some(id) } => {
            InvalidationPlan::new(vec![CacheKey::area(*id)], &["areas", PAGES])
        }
        InvalidationEvent::Area { id: None } => {
            InvalidationPlan::new(vec![], &["area", "areas", PAGES])
        }
        InvalidationEvent::Template { id: Some(id) } => {
            InvalidationPlan::new(vec![CacheKey::template(*id)], &[PAGES])
        }
        InvalidationEvent::Template { id: None } => {
            InvalidationPlan::new(vec![], &["templates", "template", PAGES])
        }
        InvalidationEvent::StaticPage { slug } => {
            InvalidationPlan::new(vec![CacheKey::static_page(slug)], &[])
        }
        InvalidationEvent::SiteSettings => InvalidationPlan::new(vec![], &["site", PAGES]),
    }
}

/// Execute a plan against a cache.
pub async fn apply_plan<C>(plan: &InvalidationPlan, cache: &C) -> PagewrightResult<InvalidationReport>
where
    C: CacheBackend + ?Sized,
{
    let mut report = InvalidationReport::default();
    for key in &plan.keys {
        if cache.delete(key).await? {
            report.keys_removed += 1;
        }
    }
    for namespace in &plan.namespaces {
        report.entries_removed += cache.delete_by_namespace(namespace).await?;
    }
    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, MemoryCacheStore};
    use pagewright_core::new_entity_id;

    async fn seeded(service_id: EntityId, area_id: EntityId, template_id: EntityId) -> MemoryCacheStore {
        let cache = MemoryCacheStore::new(CachePolicy::default());
        let keys = [
            CacheKey::company(),
            CacheKey::site(),
            CacheKey::service(service_id),
            CacheKey::service_slug("roof-repair"),
            CacheKey::area(area_id),
            CacheKey::area_slug("metairie"),
            CacheKey::local_override(service_id, area_id),
            CacheKey::template(template_id),
            CacheKey::page("/metairie/roof-repair"),
            CacheKey::page("/kenner/roof-repair"),
            CacheKey::static_page("about"),
            "crm:lead:1".to_string(),
        ];
        for key in keys {
            cache.set(&key, "v".to_string(), None).await.unwrap();
        }
        cache
    }

    async fn present(cache: &MemoryCacheStore, key: &str) -> bool {
        cache.peek(key).unwrap().is_some()
    }

    #[test]
    fn test_plan_table() {
        let id = new_entity_id();
        assert_eq!(
            plan_for(&InvalidationEvent::Company),
            InvalidationPlan::new(vec![], &["company", "pages"])
        );
        assert_eq!(
            plan_for(&InvalidationEvent::Service { id: Some(id) }),
            InvalidationPlan::new(vec![format!("service:{}", id)], &["services", "pages"])
        );
        assert_eq!(
            plan_for(&InvalidationEvent::Area { id: Some(id) }),
            InvalidationPlan::new(vec![format!("area:{}", id)], &["areas", "pages"])
        );
        assert_eq!(
            plan_for(&InvalidationEvent::Template { id: Some(id) }),
            InvalidationPlan::new(vec![format!("template:{}", id)], &["pages"])
        );
        assert_eq!(
            plan_for(&InvalidationEvent::StaticPage { slug: "about".to_string() }),
            InvalidationPlan::new(vec!["page:static:about".to_string()], &[])
        );
        assert_eq!(
            plan_for(&InvalidationEvent::SiteSettings),
            InvalidationPlan::new(vec![], &["site", "pages"])
        );
    }

    #[test]
    fn test_every_shared_subject_sweeps_pages() {
        let id = Some(new_entity_id());
        for event in [
            InvalidationEvent::Company,
            InvalidationEvent::Service { id },
            InvalidationEvent::Service { id: None },
            InvalidationEvent::Area { id },
            InvalidationEvent::Area { id: None },
            InvalidationEvent::Template { id },
            InvalidationEvent::Template { id: None },
            InvalidationEvent::SiteSettings,
        ] {
            assert!(plan_for(&event).sweeps_pages(), "{:?}", event);
        }
        assert!(!plan_for(&InvalidationEvent::StaticPage { slug: "x".to_string() }).sweeps_pages());
    }

    #[tokio::test]
    async fn test_service_invalidation_empties_pages() {
        let (s, a, t) = (new_entity_id(), new_entity_id(), new_entity_id());
        let cache = seeded(s, a, t).await;

        let report = apply_plan(&plan_for(&InvalidationEvent::Service { id: Some(s) }), &cache)
            .await
            .unwrap();
        assert_eq!(report.keys_removed, 1);
        assert_eq!(report.entries_removed, 3); // services:slug + two pages

        let stats = cache.stats().await.unwrap();
        assert!(!stats.namespaces.contains_key("pages"));
        assert!(!present(&cache, &CacheKey::service(s)).await);
        assert!(present(&cache, &CacheKey::area(a)).await);
        assert!(present(&cache, &CacheKey::company()).await);
        assert!(present(&cache, &CacheKey::static_page("about")).await);
    }

    #[tokio::test]
    async fn test_area_invalidation_takes_overrides() {
        let (s, a, t) = (new_entity_id(), new_entity_id(), new_entity_id());
        let cache = seeded(s, a, t).await;
        apply_plan(&plan_for(&InvalidationEvent::Area { id: Some(a) }), &cache)
            .await
            .unwrap();
        assert!(!present(&cache, &CacheKey::local_override(s, a)).await);
        assert!(!present(&cache, &CacheKey::area_slug("metairie")).await);
        assert!(!present(&cache, &CacheKey::area(a)).await);
        assert!(present(&cache, &CacheKey::service(s)).await);
    }

    #[tokio::test]
    async fn test_template_without_id_sweeps_template_keys() {
        let (s, a, t) = (new_entity_id(), new_entity_id(), new_entity_id());
        let cache = seeded(s, a, t).await;
        apply_plan(&plan_for(&InvalidationEvent::Template { id: None }), &cache)
            .await
            .unwrap();
        assert!(!present(&cache, &CacheKey::template(t)).await);
        assert!(!present(&cache, &CacheKey::page("/metairie/roof-repair")).await);
    }

    #[tokio::test]
    async fn test_static_page_has_no_ripple() {
        let (s, a, t) = (new_entity_id(), new_entity_id(), new_entity_id());
        let cache = seeded(s, a, t).await;
        let report = apply_plan(
            &plan_for(&InvalidationEvent::StaticPage { slug: "about".to_string() }),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(report, InvalidationReport { keys_removed: 1, entries_removed: 0 });
        assert_eq!(cache.len().await.unwrap(), 11);
    }

    #[test]
    fn test_page_scope_mapping() {
        let id = new_entity_id();
        assert_eq!(InvalidationEvent::Company.page_scope(), Some(PageScope::All));
        assert_eq!(InvalidationEvent::SiteSettings.page_scope(), Some(PageScope::All));
        assert_eq!(
            InvalidationEvent::Service { id: Some(id) }.page_scope(),
            Some(PageScope::Service(id))
        );
        assert_eq!(InvalidationEvent::Area { id: Some(id) }.page_scope(), Some(PageScope::Area(id)));
        assert_eq!(
            InvalidationEvent::Template { id: Some(id) }.page_scope(),
            Some(PageScope::Template(id))
        );
        assert_eq!(InvalidationEvent::Template { id: None }.page_scope(), Some(PageScope::All));
        assert_eq!(
            InvalidationEvent::StaticPage { slug: "x".to_string() }.page_scope(),
            None
        );
    }

    #[test]
    fn test_event_wire_format() -> Result<(), serde_json::Error> {
        let id = new_entity_id();
        let event: InvalidationEvent =
            serde_json::from_str(&format!(r#"{{"subject":"service","id":"{}"}}"#, id))?;
        assert_eq!(event, InvalidationEvent::Service { id: Some(id) });

        let event: InvalidationEvent = serde_json::from_str(r#"{"subject":"template"}"#)?;
        assert_eq!(event, InvalidationEvent::Template { id: None });

        let event: InvalidationEvent =
            serde_json::from_str(r#"{"subject":"staticPage","slug":"about"}"#)?;
        assert_eq!(event.subject(), "staticPage");

        let event: InvalidationEvent = serde_json::from_str(r#"{"subject":"siteSettings"}"#)?;
        assert_eq!(event, InvalidationEvent::SiteSettings);
        Ok(())
    }
}
