//! In-memory domain cache with TTL
//!
//! Caches host-to-site lookups so that routing does not hit the mapping store
//! on every request. Misses are cached too, as `None`. The number of entries
//! is capped; once full, expired entries are purged and new hosts are not
//! cached until space frees up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use sitehost_shared::SiteBinding;

/// Default cache TTL (60 seconds)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default entry cap
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Clone)]
struct CacheEntry {
    binding: Option<SiteBinding>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(binding: Option<SiteBinding>, ttl: Duration) -> Self {
        Self {
            binding,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe host -> site binding cache.
///
/// A zero TTL disables caching: every `get` misses and `set` stores nothing.
pub struct DomainCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for DomainCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Cached binding for a normalized host.
    ///
    /// Returns `Some(Some(binding))` for a cached hit, `Some(None)` for a
    /// cached miss, and `None` when the host is absent or expired.
    pub fn get(&self, host: &str) -> Option<Option<SiteBinding>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(host)?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.binding.clone())
        }
    }

    pub fn set(&self, host: &str, binding: Option<SiteBinding>) {
        if !self.is_enabled() {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            if !entries.contains_key(host) && entries.len() >= self.max_entries {
                entries.retain(|_, entry| !entry.is_expired());
                if entries.len() >= self.max_entries {
                    tracing::debug!(host = %host, max_entries = self.max_entries, "Domain cache full, not caching");
                    return;
                }
            }
            entries.insert(host.to_string(), CacheEntry::new(binding, self.ttl));
        }
    }

    /// Drop everything, including cached misses
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Clear expired entries
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }

    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let total = entries.len();
            let expired = entries.values().filter(|e| e.is_expired()).count();
            let negative = entries.values().filter(|e| e.binding.is_none()).count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
                negative_entries: negative,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Purge expired entries once per TTL until the process exits
pub async fn cleanup_task(cache: Arc<DomainCache>) {
    if !cache.is_enabled() {
        return;
    }
    let mut interval = tokio::time::interval(cache.ttl());

    loop {
        interval.tick().await;
        cache.cleanup();
        let stats = cache.stats();
        tracing::trace!(
            active = stats.active_entries,
            negative = stats.negative_entries,
            "Domain cache cleaned up"
        );
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    pub negative_entries: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sitehost_shared::{DomainMapping, MappingId, SiteId};
    use std::thread::sleep;
    use time::OffsetDateTime;

    fn binding(site: i64, domain: &str) -> SiteBinding {
        SiteBinding {
            mapping: DomainMapping {
                id: MappingId(site),
                site_id: SiteId(site),
                domain: domain.to_string(),
                default_page_id: None,
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            site_slug: format!("site-{}", site),
            default_page_slug: None,
        }
    }

    #[test]
    fn test_cache_get_set() {
        let cache = DomainCache::new();
        assert!(cache.get("museum.example").is_none());

        cache.set("museum.example", Some(binding(1, "museum.example")));
        let cached = cache.get("museum.example").unwrap().unwrap();
        assert_eq!(cached.site_slug, "site-1");
    }

    #[test]
    fn test_cache_negative() {
        let cache = DomainCache::new();
        cache.set("unknown.example", None);
        assert_eq!(cache.get("unknown.example"), Some(None));
        assert_eq!(cache.stats().negative_entries, 1);
    }

    #[test]
    fn test_cache_expiration() {
        let cache = DomainCache::with_ttl(Duration::from_millis(50));
        cache.set("museum.example", Some(binding(1, "museum.example")));
        assert!(cache.get("museum.example").is_some());

        sleep(Duration::from_millis(60));
        assert!(cache.get("museum.example").is_none());

        cache.cleanup();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = DomainCache::with_ttl(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.set("museum.example", Some(binding(1, "museum.example")));
        assert!(cache.get("museum.example").is_none());
    }

    #[test]
    fn test_cache_clear() {
        let cache = DomainCache::new();
        cache.set("a.example", Some(binding(1, "a.example")));
        cache.set("c.example", None);

        cache.clear();
        assert!(cache.get("a.example").is_none());
        assert!(cache.get("c.example").is_none());
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_is_capped() {
        let cache = DomainCache::new().with_max_entries(2);
        cache.set("a.example", Some(binding(1, "a.example")));
        cache.set("b.example", None);
        cache.set("c.example", None);

        assert_eq!(cache.stats().total_entries, 2);
        assert!(cache.get("c.example").is_none());

        // Existing hosts can still be refreshed
        cache.set("b.example", Some(binding(2, "b.example")));
        assert!(cache.get("b.example").unwrap().is_some());
    }

    #[test]
    fn test_full_cache_purges_expired_entries() {
        let cache = DomainCache::with_ttl(Duration::from_millis(50)).with_max_entries(1);
        cache.set("a.example", None);
        sleep(Duration::from_millis(60));

        cache.set("b.example", Some(binding(2, "b.example")));
        assert_eq!(cache.stats().total_entries, 1);
        assert_eq!(cache.get("b.example").unwrap().unwrap().mapping.site_id, SiteId(2));
    }

    #[tokio::test]
    async fn test_cleanup_task_purges_expired_entries() {
        let cache = Arc::new(DomainCache::with_ttl(Duration::from_millis(20)));
        cache.set("a.example", None);

        let task = tokio::spawn(cleanup_task(Arc::clone(&cache)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(cache.stats().total_entries, 0);
    }
}
