//! Upstream Module
//!
//! Client for the Icinga 2 REST API. It is the cache group's loader: keys are
//! decoded back into queries and fetched without retries, so coalesced
//! callers never multiply upstream traffic.

mod client;

use std::time::Duration;

pub use client::IcingaClient;

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `https://icinga.example:5665`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Accept any server certificate. TLS is still used.
    pub insecure_tls: bool,
    /// Timeout of a single upstream request
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: String::new(),
            password: String::new(),
            insecure_tls: false,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
