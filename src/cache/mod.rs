//! Cache Module
//!
//! Provides the cache group: byte-budgeted local memory with TTL expiration
//! and LRU eviction, peer lookup and singleflight loading.

mod entry;
mod group;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use group::{CacheGroup, CacheGroupConfig, Loader};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

/// Name of the group holding relayed Icinga responses
pub const ICINGA_GROUP: &str = "icinga";
