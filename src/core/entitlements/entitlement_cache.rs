// Process-local TTL cache for entitlement lookups.
//
// **DashMap:**
// Many requests resolve entitlements at the same time, so the map is shared
// across tasks. DashMap locks per shard, which keeps a single key's
// read/evict/write atomic without a global Mutex. Races between different keys
// don't matter - each key is independent.
//
// Expired entries are evicted lazily: the next lookup of the same key removes
// them. There is no background sweep.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// One cached answer. `expires_at` is absolute, so the entry is dead from that
/// instant onward regardless of when it is looked at.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub value: bool,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Build the cache key for a subscriber/entitlement pair.
pub fn cache_key(subscriber_id: &str, entitlement: &str) -> String {
    format!("{}:{}", subscriber_id, entitlement)
}

pub struct EntitlementCache {
    entries: DashMap<String, CacheEntry>,
}

impl EntitlementCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached value if it is still fresh.
    ///
    /// A stale entry is removed as a side effect. `remove_if` re-checks the
    /// expiry under the shard lock, so a fresh value written by another task in
    /// between is left alone.
    pub fn get(&self, key: &str) -> Option<bool> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(now) {
                return Some(entry.value);
            }
        }

        self.entries.remove_if(key, |_, entry| !entry.is_fresh(now));
        None
    }

    /// Store a value, overwriting whatever was there.
    pub fn set(&self, key: impl Into<String>, value: bool, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }
}

impl Default for EntitlementCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_subscriber_and_entitlement() {
        assert_eq!(cache_key("user-1", "premium"), "user-1:premium");
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_returned() {
        let cache = EntitlementCache::new();
        cache.set("user-1:premium", true, Duration::from_secs(60));

        assert_eq!(cache.get("user-1:premium"), Some(true));
        assert_eq!(cache.get("user-2:premium"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_ttl_and_is_evicted() {
        let cache = EntitlementCache::new();
        cache.set("user-1:premium", false, Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(cache.get("user-1:premium"), Some(false));

        // now == expires_at counts as stale
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("user-1:premium"), None);
        assert!(cache.entries.get("user-1:premium").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_restarts_ttl() {
        let cache = EntitlementCache::new();
        cache.set("user-1:premium", false, Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(900)).await;
        cache.set("user-1:premium", true, Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(900)).await;
        assert_eq!(cache.get("user-1:premium"), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_lookup_leaves_other_keys_alone() {
        let cache = EntitlementCache::new();
        cache.set("user-1:premium", true, Duration::from_secs(1));
        cache.set("user-2:premium", true, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.get("user-1:premium"), None);
        assert_eq!(cache.get("user-2:premium"), Some(true));
        assert_eq!(cache.entries.len(), 1);
    }
}
