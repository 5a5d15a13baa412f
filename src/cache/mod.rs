//! Process-local TTL caches.
//!
//! These are best-effort optimizations: entries are never shared across
//! instances and the underlying computations are cheap to redo, so a
//! miss is always safe.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Bounded in-memory cache with per-entry TTL.
///
/// When the entry count exceeds `capacity`, the `evict_batch` entries
/// closest to expiry are dropped in one sweep. Not strict LRU; recency
/// of use is ignored, only remaining lifetime counts.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    capacity: usize,
    evict_batch: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, evict_batch: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            evict_batch: evict_batch.max(1),
        }
    }

    /// Unbounded variant for caches that only ever hold a handful of keys
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, 1)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: remove lazily under the write lock
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
            } else {
                return Some(entry.value.clone());
            }
        }
        None
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key, CacheEntry::new(value, ttl));

        if entries.len() > self.capacity {
            entries.retain(|_, entry| !entry.is_expired());
        }
        if entries.len() > self.capacity {
            let mut by_expiry: Vec<(K, Instant)> = entries
                .iter()
                .map(|(k, entry)| (k.clone(), entry.expires_at))
                .collect();
            by_expiry.sort_by_key(|(_, expires_at)| *expires_at);
            for (key, _) in by_expiry.into_iter().take(self.evict_batch) {
                entries.remove(&key);
            }
        }
    }

    pub fn remove(&self, key: &K) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
