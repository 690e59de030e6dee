//! PAGEWRIGHT Storage - Content Store, Cache Store and Invalidation Policy
//!
//! The managed backend that owns company, service, area and page records is
//! reached only through the [`ContentStore`] trait. [`MemoryContentStore`] is
//! the in-process implementation used by tests, fixtures and single-node
//! deployments.
//!
//! The [`cache`] module holds the TTL cache that sits in front of it, together
//! with the namespace policy and the invalidation table that maps change
//! events onto evictions.

pub mod cache;
pub mod content_store;
pub mod memory;

pub use cache::{
    apply_plan, get_json, namespace_of, plan_for, set_json, CacheBackend, CacheEntry, CacheKey,
    CachePolicy, CacheStats, Clock, InvalidationEvent, InvalidationPlan, InvalidationReport,
    ManualClock, MemoryCacheStore, NamespaceStats, SystemClock,
};
pub use content_store::ContentStore;
pub use memory::MemoryContentStore;

use pagewright_core::{EntityId, EntityType, PagewrightResult, StorageError};
use serde::{Deserialize, Serialize};

// ============================================================================
// PAGE SCOPES
// ============================================================================

/// Selects the generated pages whose staleness flag an upstream change
/// must raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum PageScope {
    /// Every generated page.
    All,
    /// Pages rendered for one service.
    Service(EntityId),
    /// Pages rendered for one area.
    Area(EntityId),
    /// Pages whose template is this one.
    Template(EntityId),
}

impl PageScope {
    /// True when `page` falls inside this scope.
    pub fn matches(&self, page: &pagewright_core::GeneratedPage) -> bool {
        match self {
            PageScope::All => true,
            PageScope::Service(id) => page.service_id == *id,
            PageScope::Area(id) => page.area_id == *id,
            PageScope::Template(id) => page.template_id == Some(*id),
        }
    }
}

// ============================================================================
// FIND HELPERS
// ============================================================================

/// Turn an optional fetch into a strict one: `None` becomes
/// [`StorageError::NotFound`].
pub fn require<T>(found: Option<T>, entity_type: EntityType, id: impl ToString) -> PagewrightResult<T> {
    found.ok_or_else(|| StorageError::not_found(entity_type, id).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::{new_entity_id, GeneratedPage};

    #[test]
    fn test_require_maps_none_to_not_found() {
        let found: PagewrightResult<u32> = require(Some(7), EntityType::Service, "s1");
        assert_eq!(found.unwrap(), 7);

        let missing: PagewrightResult<u32> = require(None, EntityType::Service, "s1");
        let err = missing.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn test_page_scope_matches() {
        let service = new_entity_id();
        let area = new_entity_id();
        let template = new_entity_id();
        let page = GeneratedPage::new("/a/s", service, area, Some(template));

        assert!(PageScope::All.matches(&page));
        assert!(PageScope::Service(service).matches(&page));
        assert!(PageScope::Area(area).matches(&page));
        assert!(PageScope::Template(template).matches(&page));
        assert!(!PageScope::Service(area).matches(&page));
        assert!(!PageScope::Template(new_entity_id()).matches(&page));
    }
}
