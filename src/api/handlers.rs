//! API Handlers
//!
//! Relay handlers for the `/icinga/...` endpoints, the internal peer
//! transport, and the stats/health endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query as UrlQuery, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client as HttpClient;
use tracing::{info, warn};

use crate::cache::{CacheGroup, ICINGA_GROUP};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::models::{FilterParams, HealthResponse, Query, StatsResponse};
use crate::peers::{decode_key, HttpPool, PeerAllowList};
use crate::upstream::IcingaClient;

/// Application state shared across all handlers.
///
/// The cache group is the only shared mutable resource; it synchronizes
/// internally, so handlers just hold an `Arc` to it.
#[derive(Clone)]
pub struct AppState {
    pub group: Arc<CacheGroup>,
    /// Addresses allowed on the peer transport
    pub peers: Arc<PeerAllowList>,
}

impl AppState {
    pub fn new(group: Arc<CacheGroup>, peers: PeerAllowList) -> Self {
        Self {
            group,
            peers: Arc::new(peers),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the upstream client, the peer pool and the cache group.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let upstream = IcingaClient::new(&config.upstream())?;

        let peer_http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.peer_timeout))
            .build()
            .map_err(|e| RelayError::CacheInternal(format!("failed to build peer client: {}", e)))?;
        let pool = HttpPool::new(&config.cache_self_url, &config.cache_peers, peer_http)?;
        let allow = pool.resolve_allow_list().await;
        info!(
            "Peer pool: self={}, remote peers={}, allowed addresses={}",
            pool.self_url(),
            pool.peer_count(),
            allow.len()
        );

        let group = CacheGroup::new(
            ICINGA_GROUP,
            config.cache_group(),
            Arc::new(upstream),
            Arc::new(pool),
        );

        Ok(Self::new(group, allow))
    }
}

/// Resolves `query` through the cache group and writes the upstream JSON.
async fn relay(state: &AppState, query: Query) -> Result<Response> {
    let key = query.derive_key();
    let body = state.group.get(&key).await?;

    Ok(json_body(body))
}

fn json_body(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Handler for GET /icinga/:check_type
pub async fn icinga_check_handler(
    State(state): State<AppState>,
    Path(check_type): Path<String>,
) -> Result<Response> {
    relay(&state, Query::objects(check_type, None)?).await
}

/// Handler for GET /icinga/:check_type/:object_id
pub async fn icinga_object_handler(
    State(state): State<AppState>,
    Path((check_type, object_id)): Path<(String, String)>,
) -> Result<Response> {
    relay(&state, Query::objects(check_type, Some(object_id))?).await
}

/// Handler for GET /icinga/dynamic_text/:host_name
///
/// Relays the host's custom variables, which dashboards render as text.
pub async fn icinga_dynamic_text_handler(
    State(state): State<AppState>,
    Path(host_name): Path<String>,
) -> Result<Response> {
    relay(&state, Query::dynamic_text(host_name)?).await
}

/// Handler for GET /icinga/check_state?object_type=..&filter=..
pub async fn icinga_check_state_handler(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<FilterParams>,
) -> Result<Response> {
    let (object_type, filter) = params.require()?;
    relay(&state, Query::check_state(object_type, filter)?).await
}

/// Handler for GET /icinga/check_result?object_type=..&filter=..
pub async fn icinga_check_result_handler(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<FilterParams>,
) -> Result<Response> {
    let (object_type, filter) = params.require()?;
    relay(&state, Query::check_result(object_type, filter)?).await
}

/// Handler for GET /_cache_internal/:group/:key
///
/// Serves entries this node owns to other cache peers. `key` is hex encoded.
pub async fn peer_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Path((group, key)): Path<(String, String)>,
) -> Result<Response> {
    if !state.peers.contains(&remote.ip()) {
        warn!("Rejected peer request from {}", remote);
        return Err(RelayError::PeerRejected(remote.ip().to_string()));
    }
    if group != state.group.name() {
        return Err(RelayError::UnknownGroup(group));
    }

    let key = decode_key(&key)?;
    let body = state.group.get_local(&key).await?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.group.stats().await;
    let in_flight = state.group.in_flight().await;

    Json(StatsResponse::new(state.group.name(), stats, in_flight))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
