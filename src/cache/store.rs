//! Cache Store Module
//!
//! Local memory of a cache group: HashMap storage with LRU tracking, lazy TTL
//! expiration and a byte budget.

use std::collections::HashMap;

use bytes::Bytes;

use crate::cache::entry::entry_size;
use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Byte-budgeted cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Bytes currently held (sum of entry sizes)
    used_bytes: u64,
    /// Maximum number of bytes the entries may occupy
    max_bytes: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_bytes` of keys and values.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            used_bytes: 0,
            max_bytes,
        }
    }

    // == Set ==
    /// Stores a payload under `key` for `ttl_seconds`.
    ///
    /// An existing entry is replaced and its TTL reset. Least recently used
    /// entries are evicted until the new entry fits. Returns `false` without
    /// touching the store when the entry alone is larger than the budget.
    pub fn set(&mut self, key: String, value: Bytes, ttl_seconds: u64) -> bool {
        let size = entry_size(&key, &value);
        if size > self.max_bytes {
            return false;
        }

        self.remove_entry(&key);

        while self.used_bytes + size > self.max_bytes {
            match self.lru.evict_oldest() {
                Some(evicted_key) => {
                    if let Some(evicted) = self.entries.remove(&evicted_key) {
                        self.used_bytes -= evicted.size;
                        self.stats.record_eviction();
                    }
                }
                None => break,
            }
        }

        let entry = CacheEntry::new(&key, value, ttl_seconds);
        self.used_bytes += entry.size;
        self.lru.touch(&key);
        self.entries.insert(key, entry);

        true
    }

    // == Get ==
    /// Retrieves a payload by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.used_bytes);
        stats
    }

    /// Mutable access for counters recorded by the owning group.
    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        expired_keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently charged against the budget.
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    fn remove_entry(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.used_bytes -= entry.size;
            self.lru.remove(key);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn payload(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(1024);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(1024);

        assert!(store.set("key1".to_string(), payload("value1"), 300));

        assert_eq!(store.get("key1"), Some(payload("value1")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(1024);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_overwrite_recharges_size() {
        let mut store = CacheStore::new(1024);

        store.set("key1".to_string(), payload("value1"), 300);
        store.set("key1".to_string(), payload("v2"), 300);

        assert_eq!(store.get("key1"), Some(payload("v2")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(1024);

        store.set("key1".to_string(), payload("value1"), 1);
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_store_evicts_least_recently_used_to_fit_budget() {
        // Each entry is 4 (key) + 6 (value) = 10 bytes
        let mut store = CacheStore::new(30);

        store.set("key1".to_string(), payload("value1"), 300);
        store.set("key2".to_string(), payload("value2"), 300);
        store.set("key3".to_string(), payload("value3"), 300);

        // Access key1 so key2 becomes the oldest
        store.get("key1");

        store.set("key4".to_string(), payload("value4"), 300);

        assert_eq!(store.len(), 3);
        assert!(store.used_bytes() <= 30);
        assert!(store.get("key1").is_some());
        assert_eq!(store.get("key2"), None);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_large_entry_evicts_several() {
        let mut store = CacheStore::new(30);

        store.set("key1".to_string(), payload("value1"), 300);
        store.set("key2".to_string(), payload("value2"), 300);
        store.set("big".to_string(), payload("0123456789abcdefghijklm"), 300);

        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), 26);
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_store_rejects_entry_larger_than_budget() {
        let mut store = CacheStore::new(8);

        store.set("k".to_string(), payload("v"), 300);
        let stored = store.set("key".to_string(), payload("too large"), 300);

        assert!(!stored);
        assert_eq!(store.get("key"), None);
        assert!(store.get("k").is_some(), "existing entries are kept");
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(1024);

        store.set("key1".to_string(), payload("value1"), 300);
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_bytes, 10);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(1024);

        store.set("key1".to_string(), payload("value1"), 1);
        store.set("key2".to_string(), payload("value2"), 10);

        sleep(Duration::from_millis(1100));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_bytes(), 10);
        assert!(store.get("key2").is_some());
    }
}
