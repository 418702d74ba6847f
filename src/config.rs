//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::CacheGroupConfig;
use crate::upstream::UpstreamConfig;

/// Default cache entry lifetime in seconds
pub const DEFAULT_CACHE_EXPIRY_SECONDS: u64 = 16;

/// Default cache byte budget (20 MiB)
pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub http_addr: String,
    /// Base URL of the Icinga 2 API, e.g. `https://icinga:5665`
    pub icinga_url: String,
    /// Icinga API user
    pub icinga_username: String,
    /// Icinga API password
    pub icinga_password: String,
    /// Skip upstream certificate verification
    pub icinga_insecure_tls: bool,
    /// Cache entry TTL in seconds
    pub cache_expiry_seconds: u64,
    /// Cache byte budget
    pub cache_size_bytes: u64,
    /// URL other cache peers use to reach this node
    pub cache_self_url: String,
    /// URLs of the other cache peers
    pub cache_peers: Vec<String>,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Per-request timeout applied by the serving layer, in seconds
    pub request_timeout: u64,
    /// Timeout for a single upstream call, in seconds
    pub upstream_timeout: u64,
    /// Timeout for a fetch from the owning peer, in seconds. Kept well below
    /// `request_timeout` so a hung peer still leaves time for a local load.
    pub peer_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `HTTP_ADDR` - Bind address (default: 0.0.0.0:8585)
    /// - `ICINGA_URL` - Icinga API base URL (required)
    /// - `ICINGA_USERNAME` / `ICINGA_PASSWORD` - Icinga API credentials
    /// - `ICINGA_INSECURE_TLS` - Skip certificate verification (default: false)
    /// - `CACHE_EXPIRY_DURATION_SECONDS` - Entry TTL (default: 16, also when 0)
    /// - `CACHE_SIZE_BYTES` - Byte budget (default: 20971520, also when 0)
    /// - `CACHE_SELF_URL` - This node's peer URL (default: http://localhost:8585)
    /// - `CACHE_PEERS` - Comma separated peer URLs (default: none)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `REQUEST_TIMEOUT` - Request timeout in seconds (default: 30)
    /// - `UPSTREAM_TIMEOUT` - Upstream call timeout in seconds (default: 20)
    /// - `CACHE_PEER_TIMEOUT` - Peer fetch timeout in seconds (default: 5)
    ///
    /// Zero durations, budgets and intervals fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            http_addr: lookup("HTTP_ADDR").unwrap_or(defaults.http_addr),
            icinga_url: lookup("ICINGA_URL").unwrap_or(defaults.icinga_url),
            icinga_username: lookup("ICINGA_USERNAME").unwrap_or(defaults.icinga_username),
            icinga_password: lookup("ICINGA_PASSWORD").unwrap_or(defaults.icinga_password),
            icinga_insecure_tls: lookup("ICINGA_INSECURE_TLS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.icinga_insecure_tls),
            cache_expiry_seconds: parsed("CACHE_EXPIRY_DURATION_SECONDS")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cache_expiry_seconds),
            cache_size_bytes: parsed("CACHE_SIZE_BYTES")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cache_size_bytes),
            cache_self_url: lookup("CACHE_SELF_URL").unwrap_or(defaults.cache_self_url),
            cache_peers: lookup("CACHE_PEERS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.cache_peers),
            cleanup_interval: parsed("CLEANUP_INTERVAL")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cleanup_interval),
            request_timeout: parsed("REQUEST_TIMEOUT")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.request_timeout),
            upstream_timeout: parsed("UPSTREAM_TIMEOUT")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.upstream_timeout),
            peer_timeout: parsed("CACHE_PEER_TIMEOUT")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.peer_timeout),
        }
    }

    /// Cache group parameters derived from this configuration.
    pub fn cache_group(&self) -> CacheGroupConfig {
        CacheGroupConfig::new(self.cache_size_bytes, self.cache_expiry_seconds)
    }

    /// Upstream client parameters derived from this configuration.
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.icinga_url.clone(),
            username: self.icinga_username.clone(),
            password: self.icinga_password.clone(),
            insecure_tls: self.icinga_insecure_tls,
            timeout: Duration::from_secs(self.upstream_timeout),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8585".to_string(),
            icinga_url: String::new(),
            icinga_username: String::new(),
            icinga_password: String::new(),
            icinga_insecure_tls: false,
            cache_expiry_seconds: DEFAULT_CACHE_EXPIRY_SECONDS,
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
            cache_self_url: "http://localhost:8585".to_string(),
            cache_peers: Vec::new(),
            cleanup_interval: 1,
            request_timeout: 30,
            upstream_timeout: 20,
            peer_timeout: 5,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
