//! In-process TTL cache with namespace tagging.
//!
//! Every key carries a namespace: the text before its first `:`. Namespaces
//! pick the default TTL and are the unit of coarse invalidation.
//!
//! The cache is a performance accelerant only. The generated page record's
//! `needs_regeneration` flag stays the source of truth, so a cache that is
//! cold, cleared, or out of date on another instance never produces a wrong
//! page.
//!
//! # Example
//!
//! ```ignore
//! let cache = MemoryCacheStore::new(CachePolicy::default());
//! cache.set(&CacheKey::service(id), json, None).await?;
//! let plan = plan_for(&InvalidationEvent::Service { id: Some(id) });
//! let report = apply_plan(&plan, &cache).await?;
//! ```

pub mod clock;
pub mod invalidation;
pub mod namespace;
pub mod store;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use invalidation::{apply_plan, plan_for, InvalidationEvent, InvalidationPlan, InvalidationReport};
pub use namespace::{namespace_of, CacheKey, CachePolicy, NAMESPACE_DELIMITER};
pub use store::MemoryCacheStore;
pub use traits::{get_json, set_json, CacheBackend, CacheEntry, CacheStats, NamespaceStats};
