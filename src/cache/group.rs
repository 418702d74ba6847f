//! Cache Group Module
//!
//! A named cache in front of a loader. A `get` is answered from local memory,
//! else from the peer owning the key, else by the loader. Concurrent misses
//! for one key share a single flight, so the loader runs at most once per key
//! at a time no matter how many callers wait on it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::config::{DEFAULT_CACHE_EXPIRY_SECONDS, DEFAULT_CACHE_SIZE_BYTES};
use crate::error::{RelayError, Result};
use crate::peers::PeerPicker;

// == Loader ==
/// Produces the value for a key on a miss owned by this node.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Bytes>;
}

// == Group Config ==
/// Size and lifetime limits of a cache group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGroupConfig {
    /// Byte budget for keys and values held locally
    pub max_bytes: u64,
    /// Lifetime of a loaded entry in seconds
    pub ttl_seconds: u64,
}

impl CacheGroupConfig {
    /// Zero values fall back to the defaults.
    pub fn new(max_bytes: u64, ttl_seconds: u64) -> Self {
        Self {
            max_bytes: if max_bytes == 0 {
                DEFAULT_CACHE_SIZE_BYTES
            } else {
                max_bytes
            },
            ttl_seconds: if ttl_seconds == 0 {
                DEFAULT_CACHE_EXPIRY_SECONDS
            } else {
                ttl_seconds
            },
        }
    }
}

impl Default for CacheGroupConfig {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

type Flight = Shared<BoxFuture<'static, Result<Bytes>>>;

/// Flights are registered per key and per mode. A local-only get must never
/// wait on a flight that forwards to a peer, since that peer may be waiting
/// on this node.
type FlightKey = (String, bool);

/// Store and in-flight registry, guarded together so a finished flight is
/// either visible in the store or still registered, never neither.
struct GroupState {
    store: CacheStore,
    flights: HashMap<FlightKey, Flight>,
}

/// Where a fetched value came from.
enum Source {
    Local,
    Peer,
}

// == Cache Group ==
pub struct CacheGroup {
    name: String,
    config: CacheGroupConfig,
    loader: Arc<dyn Loader>,
    peers: Arc<dyn PeerPicker>,
    state: Mutex<GroupState>,
}

impl CacheGroup {
    // == Constructor ==
    pub fn new(
        name: impl Into<String>,
        config: CacheGroupConfig,
        loader: Arc<dyn Loader>,
        peers: Arc<dyn PeerPicker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            config,
            loader,
            peers,
            state: Mutex::new(GroupState {
                store: CacheStore::new(config.max_bytes),
                flights: HashMap::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> CacheGroupConfig {
        self.config
    }

    // == Get ==
    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(self: &Arc<Self>, key: &str) -> Result<Bytes> {
        self.get_with(key, true).await
    }

    /// Like [`CacheGroup::get`] but never forwards to a peer. Used to serve
    /// peer requests, which must not bounce between nodes.
    pub async fn get_local(self: &Arc<Self>, key: &str) -> Result<Bytes> {
        self.get_with(key, false).await
    }

    async fn get_with(self: &Arc<Self>, key: &str, allow_peers: bool) -> Result<Bytes> {
        let flight = {
            let mut state = self.state.lock().await;

            if let Some(value) = state.store.get(key) {
                return Ok(value);
            }

            let flight_key = (key.to_string(), allow_peers);
            match state.flights.get(&flight_key).cloned() {
                Some(flight) => {
                    state.store.stats_mut().record_coalesced();
                    flight
                }
                None => {
                    let flight = self.start_flight(key.to_string(), allow_peers);
                    state.flights.insert(flight_key, flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    // == Flights ==
    /// Spawns the load for `key` so it completes even if every caller goes away.
    ///
    /// Must be called with the state lock held; the task only touches the
    /// state after the caller has registered the flight.
    fn start_flight(self: &Arc<Self>, key: String, allow_peers: bool) -> Flight {
        let group = Arc::clone(self);
        let task_key = key.clone();
        let handle = tokio::spawn(async move { group.run_flight(task_key, allow_peers).await });

        let group = Arc::clone(self);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    group
                        .state
                        .lock()
                        .await
                        .flights
                        .remove(&(key.clone(), allow_peers));
                    Err(RelayError::CacheInternal(format!(
                        "load of '{}' aborted: {}",
                        key, e
                    )))
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn run_flight(&self, key: String, allow_peers: bool) -> Result<Bytes> {
        let result = self.fetch(&key, allow_peers).await;

        let mut state = self.state.lock().await;
        state.flights.remove(&(key.clone(), allow_peers));

        match result {
            Ok((value, Source::Local)) => {
                if !state.store.set(key.clone(), value.clone(), self.config.ttl_seconds) {
                    debug!(
                        "Value for '{}' ({} bytes) exceeds cache budget, not stored",
                        key,
                        value.len()
                    );
                }
                Ok(value)
            }
            Ok((value, Source::Peer)) => Ok(value),
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, key: &str, allow_peers: bool) -> Result<(Bytes, Source)> {
        if allow_peers {
            if let Some(peer) = self.peers.pick(key) {
                let result = peer.fetch(&self.name, key).await;
                self.state
                    .lock()
                    .await
                    .store
                    .stats_mut()
                    .record_peer_load(result.is_ok());

                match result {
                    Ok(value) => return Ok((value, Source::Peer)),
                    Err(e) => warn!(
                        "Peer {} failed for '{}', loading locally: {}",
                        peer.url(),
                        key,
                        e
                    ),
                }
            }
        }

        let result = self.loader.load(key).await;
        self.state
            .lock()
            .await
            .store
            .stats_mut()
            .record_load(result.is_ok());

        if let Err(e) = &result {
            warn!("Load of '{}' in group '{}' failed: {}", key, self.name, e);
        }

        result.map(|value| (value, Source::Local))
    }

    // == Maintenance ==
    /// Current counters of this group.
    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.store.stats()
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.state.lock().await.store.cleanup_expired()
    }

    /// Number of loads currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.flights.len()
    }
}

impl std::fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheGroup")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
