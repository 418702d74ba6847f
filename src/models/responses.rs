//! Response DTOs for the operational endpoints
//!
//! Relay endpoints return upstream JSON verbatim and have no DTO.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cache group the counters belong to
    pub group: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Loads currently in flight
    pub in_flight: usize,
}

impl StatsResponse {
    pub fn new(group: impl Into<String>, stats: CacheStats, in_flight: usize) -> Self {
        Self {
            group: group.into(),
            hit_rate: stats.hit_rate(),
            stats,
            in_flight,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
