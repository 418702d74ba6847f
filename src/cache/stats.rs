//! Cache Statistics Module
//!
//! Tracks cache group counters: local hits and misses, evictions, loads and
//! peer traffic.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Gets answered from local memory
    pub hits: u64,
    /// Gets that found nothing (or only an expired entry) locally
    pub misses: u64,
    /// Entries evicted to stay within the byte budget
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Bytes currently charged against the budget
    pub total_bytes: u64,
    /// Loader invocations
    pub loads: u64,
    /// Loader invocations that failed
    pub load_errors: u64,
    /// Values fetched from an owning peer
    pub peer_loads: u64,
    /// Peer fetches that failed and fell back to the loader
    pub peer_errors: u64,
    /// Callers that joined a load already in flight
    pub coalesced: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_load(&mut self, ok: bool) {
        self.loads += 1;
        if !ok {
            self.load_errors += 1;
        }
    }

    pub fn record_peer_load(&mut self, ok: bool) {
        if ok {
            self.peer_loads += 1;
        } else {
            self.peer_errors += 1;
        }
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    // == Update Occupancy ==
    /// Updates the entry count and byte total.
    pub fn set_occupancy(&mut self, entries: usize, bytes: u64) {
        self.total_entries = entries;
        self.total_bytes = bytes;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.loads, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_load_counts_errors() {
        let mut stats = CacheStats::new();
        stats.record_load(true);
        stats.record_load(false);
        assert_eq!(stats.loads, 2);
        assert_eq!(stats.load_errors, 1);
    }

    #[test]
    fn test_record_peer_load() {
        let mut stats = CacheStats::new();
        stats.record_peer_load(true);
        stats.record_peer_load(false);
        stats.record_peer_load(false);
        assert_eq!(stats.peer_loads, 1);
        assert_eq!(stats.peer_errors, 2);
    }
}
