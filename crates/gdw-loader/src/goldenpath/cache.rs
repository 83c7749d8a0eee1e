//! Bounded LRU cache for mRNA/EST window lookups
//!
//! The overlap-recheck tiers query the same genomic window once per
//! candidate transcript; this cache collapses those repeats. The engine is
//! single-threaded per instance, so no interior locking is needed.

use std::collections::HashMap;
use std::hash::Hash;

/// Bounded least-recently-used cache.
///
/// Recency is tracked with a monotonic access counter per entry; eviction
/// removes the entry with the smallest counter.
pub struct LruCache<K: Hash + Eq + Clone, V> {
    entries: HashMap<K, (V, u64)>,
    capacity: usize,
    access_counter: u64,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            access_counter: 0,
        }
    }

    /// Look up a key, refreshing its recency on a hit
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.access_counter += 1;
        let counter = self.access_counter;
        match self.entries.get_mut(key) {
            Some((value, stamp)) => {
                *stamp = counter;
                Some(value)
            },
            None => None,
        }
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn insert(&mut self, key: K, value: V) {
        self.access_counter += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(key, (value, self.access_counter));
    }

    fn evict_lru(&mut self) {
        if let Some(lru_key) = self
            .entries
            .iter()
            .min_by_key(|(_, (_, stamp))| *stamp)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&lru_key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
