//! Time-boxed session cache.
//!
//! Advisory only: every caller must behave correctly if the cache
//! always misses. A miss or a stale entry falls back to the record
//! store; entries older than the TTL are evicted on access.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// TTL-bounded in-memory cache keyed by `K`.
pub struct SessionCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> SessionCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// The cached value, if present and younger than the TTL. A stale
    /// entry is removed and reported as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite, resetting the entry's age.
    pub async fn put(&self, key: K, value: V) {
        self.entries.lock().await.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop one entry.
    pub async fn invalidate(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    /// Drop everything. Used after externally-visible mutations the
    /// cache cannot observe itself.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_within_ttl() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.put("alice", 42u32).await;
        assert_eq!(cache.get(&"alice").await, Some(42));
        assert_eq!(cache.get(&"bob").await, None);
    }

    #[tokio::test]
    async fn stale_entry_is_a_miss() {
        let cache = SessionCache::new(Duration::from_millis(0));
        cache.put("alice", 42u32).await;
        assert_eq!(cache.get(&"alice").await, None);
        // And it was evicted, not just hidden.
        assert!(cache.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn put_resets_age_and_overwrites() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.put("alice", 1u32).await;
        cache.put("alice", 2u32).await;
        assert_eq!(cache.get(&"alice").await, Some(2));
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.put("alice", 1u32).await;
        cache.put("bob", 2u32).await;

        cache.invalidate(&"alice").await;
        assert_eq!(cache.get(&"alice").await, None);
        assert_eq!(cache.get(&"bob").await, Some(2));

        cache.clear().await;
        assert_eq!(cache.get(&"bob").await, None);
    }
}
