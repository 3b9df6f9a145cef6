//! In-memory TTL cache shared by the credential resolver and the secret cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{Error, ErrorContext};
use crate::Result;

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Entries live exactly `ttl` from insertion; there is no early invalidation.
/// Concurrent inserts for one key are last-writer-wins.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(self.ttl))
            .map(|e| e.value.clone()))
    }

    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let ttl = self.ttl;
        entries.retain(|_, e| !e.is_expired(ttl));
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Live (unexpired) entry count.
    pub fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.values().filter(|e| !e.is_expired(self.ttl)).count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> Error {
    Error::runtime_with_context(
        "cache lock poisoned",
        ErrorContext::new().with_source("ttl_cache"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert("k", 1).unwrap();
        assert_eq!(cache.get(&"k").unwrap(), Some(1));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"k").unwrap(), None);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn last_writer_wins() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", "a").unwrap();
        cache.insert("k", "b").unwrap();
        assert_eq!(cache.get(&"k").unwrap(), Some("b"));
        assert_eq!(cache.len().unwrap(), 1);
    }
}
