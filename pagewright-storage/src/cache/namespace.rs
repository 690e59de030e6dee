//! Key namespaces, per-namespace TTL policy and key constructors.

use pagewright_core::EntityId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Separates a key's namespace from the rest of the key.
pub const NAMESPACE_DELIMITER: char = ':';

/// Namespace of a key: the text before the first `:`, or the whole key when
/// there is none.
pub fn namespace_of(key: &str) -> &str {
    match key.find(NAMESPACE_DELIMITER) {
        Some(idx) => &key[..idx],
        None => key,
    }
}

// ============================================================================
// TTL POLICY
// ============================================================================

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86400);

/// Default TTL per namespace. An explicit TTL passed to `set` always wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    default_ttl: Duration,
    ttls: BTreeMap<String, Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        let mut ttls = BTreeMap::new();
        // Singular and plural spellings share a TTL; keys use both.
        for ns in [
            "pages", "page", "services", "service", "areas", "area", "templates", "template",
        ] {
            ttls.insert(ns.to_string(), HOUR);
        }
        for ns in ["settings", "company", "site"] {
            ttls.insert(ns.to_string(), DAY);
        }
        ttls.insert("crm".to_string(), Duration::from_secs(900));
        ttls.insert("query".to_string(), Duration::from_secs(300));
        Self {
            default_ttl: Duration::from_secs(1800),
            ttls,
        }
    }
}

impl CachePolicy {
    /// Load the policy from environment variables.
    ///
    /// `PAGEWRIGHT_CACHE_DEFAULT_TTL_SECS` replaces the fallback TTL; the
    /// per-namespace table is fixed.
    pub fn from_env() -> Self {
        let policy = Self::default();
        match std::env::var("PAGEWRIGHT_CACHE_DEFAULT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(secs) if secs > 0 => policy.with_default_ttl(Duration::from_secs(secs)),
            _ => policy,
        }
    }

    /// Replace the fallback TTL for namespaces without an entry.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the TTL for one namespace.
    pub fn with_namespace_ttl(mut self, namespace: impl Into<String>, ttl: Duration) -> Self {
        self.ttls.insert(namespace.into(), ttl);
        self
    }

    /// TTL for a namespace, falling back to the default.
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.ttls.get(namespace).copied().unwrap_or(self.default_ttl)
    }

    /// TTL for a full key.
    pub fn ttl_for_key(&self, key: &str) -> Duration {
        self.ttl_for(namespace_of(key))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

// ============================================================================
// KEY CONSTRUCTORS
// ============================================================================

/// Builders for every key the pipelines read or write.
pub struct CacheKey;

impl CacheKey {
    /// `service:{id}`
    pub fn service(id: EntityId) -> String {
        format!("service:{}", id)
    }

    /// `services:slug:{slug}`
    pub fn service_slug(slug: &str) -> String {
        format!("services:slug:{}", slug)
    }

    /// `area:{id}`
    pub fn area(id: EntityId) -> String {
        format!("area:{}", id)
    }

    /// `areas:slug:{slug}`
    pub fn area_slug(slug: &str) -> String {
        format!("areas:slug:{}", slug)
    }

    /// `areas:override:{service_id}:{area_id}`
    pub fn local_override(service_id: EntityId, area_id: EntityId) -> String {
        format!("areas:override:{}:{}", service_id, area_id)
    }

    /// `template:{id}`
    pub fn template(id: EntityId) -> String {
        format!("template:{}", id)
    }

    /// `company:settings`
    pub fn company() -> String {
        "company:settings".to_string()
    }

    /// `site:settings`
    pub fn site() -> String {
        "site:settings".to_string()
    }

    /// `pages:{path}`
    pub fn page(path: &str) -> String {
        format!("pages:{}", path)
    }

    /// `page:static:{slug}`
    pub fn static_page(slug: &str) -> String {
        format!("page:static:{}", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::new_entity_id;

    #[test]
    fn test_namespace_of() {
        assert_eq!(namespace_of("pages:/metairie/roof-repair"), "pages");
        assert_eq!(namespace_of("page:static:about"), "page");
        assert_eq!(namespace_of("company:settings"), "company");
        assert_eq!(namespace_of("plain"), "plain");
        assert_eq!(namespace_of(":leading"), "");
    }

    #[test]
    fn test_policy_table() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl_for("pages"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for("services"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for("areas"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for("templates"), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for("settings"), Duration::from_secs(86400));
        assert_eq!(policy.ttl_for("company"), Duration::from_secs(86400));
        assert_eq!(policy.ttl_for("crm"), Duration::from_secs(900));
        assert_eq!(policy.ttl_for("query"), Duration::from_secs(300));
        assert_eq!(policy.ttl_for("anything-else"), Duration::from_secs(1800));
    }

    #[test]
    fn test_policy_overrides() {
        let policy = CachePolicy::default()
            .with_default_ttl(Duration::from_secs(10))
            .with_namespace_ttl("crm", Duration::from_secs(1));
        assert_eq!(policy.ttl_for("unknown"), Duration::from_secs(10));
        assert_eq!(policy.ttl_for("crm"), Duration::from_secs(1));
        assert_eq!(policy.ttl_for_key("pages:/x"), Duration::from_secs(3600));
    }

    #[test]
    fn test_key_namespaces() {
        let id = new_entity_id();
        assert_eq!(namespace_of(&CacheKey::service(id)), "service");
        assert_eq!(namespace_of(&CacheKey::service_slug("roof-repair")), "services");
        assert_eq!(namespace_of(&CacheKey::area(id)), "area");
        assert_eq!(namespace_of(&CacheKey::area_slug("metairie")), "areas");
        assert_eq!(namespace_of(&CacheKey::local_override(id, id)), "areas");
        assert_eq!(namespace_of(&CacheKey::template(id)), "template");
        assert_eq!(namespace_of(&CacheKey::company()), "company");
        assert_eq!(namespace_of(&CacheKey::site()), "site");
        assert_eq!(namespace_of(&CacheKey::page("/metairie/roof-repair")), "pages");
        assert_eq!(CacheKey::static_page("about"), "page:static:about");
    }
}
