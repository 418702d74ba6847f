//! HTTP peer pool: ring-based owner selection plus the client side of the
//! internal peer transport. Keys travel hex-encoded in the last path segment.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client as HttpClient, Url};
use tracing::warn;

use super::{HashRing, Peer, PeerAllowList, PeerPicker, DEFAULT_REPLICAS};
use crate::error::{RelayError, Result};

/// Path prefix of the internal peer transport
pub const PEER_BASE_PATH: &str = "_cache_internal";

// == HTTP Peer ==
/// A cache peer reached over the internal HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    base: Url,
    name: String,
    http: HttpClient,
}

impl HttpPeer {
    pub fn new(url: &str, http: HttpClient) -> Result<Self> {
        let base = Url::parse(url)
            .map_err(|e| RelayError::CacheInternal(format!("invalid peer url '{}': {}", url, e)))?;

        Ok(Self {
            base,
            name: url.to_string(),
            http,
        })
    }

    fn entry_url(&self, group: &str, key: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::CacheInternal(format!("peer url '{}' cannot be a base", self.name)))?
            .pop_if_empty()
            .push(PEER_BASE_PATH)
            .push(group)
            .push(&hex::encode(key));
        Ok(url)
    }
}

#[async_trait]
impl Peer for HttpPeer {
    async fn fetch(&self, group: &str, key: &str) -> Result<Bytes> {
        let url = self.entry_url(group, key)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::PeerFetch(format!("{}: {}", self.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::PeerFetch(format!(
                "{} answered {}",
                self.name, status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| RelayError::PeerFetch(format!("{}: {}", self.name, e)))
    }

    fn url(&self) -> &str {
        &self.name
    }
}

// == HTTP Pool ==
/// Peer picker over a fixed list of HTTP peers.
///
/// `self_url` must be the exact string the other nodes list for this node,
/// otherwise the rings differ between nodes.
#[derive(Debug)]
pub struct HttpPool {
    self_url: String,
    ring: HashRing,
    peers: HashMap<String, Arc<HttpPeer>>,
    urls: Vec<String>,
}

impl HttpPool {
    pub fn new(self_url: &str, peer_urls: &[String], http: HttpClient) -> Result<Self> {
        let self_url = normalize(self_url);
        let mut urls = vec![self_url.clone()];
        let mut peers = HashMap::new();

        for url in peer_urls.iter().map(|u| normalize(u)) {
            if url == self_url || peers.contains_key(&url) {
                continue;
            }
            peers.insert(url.clone(), Arc::new(HttpPeer::new(&url, http.clone())?));
            urls.push(url);
        }

        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add(urls.iter().cloned());

        Ok(Self {
            self_url,
            ring,
            peers,
            urls,
        })
    }

    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Number of remote peers (excluding this node).
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    // == Allow List ==
    /// Addresses of all configured nodes, resolving host names via DNS.
    ///
    /// Names that fail to resolve are logged and left out.
    pub async fn resolve_allow_list(&self) -> PeerAllowList {
        let mut addrs: Vec<IpAddr> = Vec::new();

        for url in &self.urls {
            let Some((host, port)) = host_and_port(url) else {
                warn!("Peer url {} has no host, skipping", url);
                continue;
            };

            if let Ok(ip) = host.parse::<IpAddr>() {
                addrs.push(ip);
                continue;
            }

            let lookup = tokio::net::lookup_host((host.as_str(), port)).await;
            match lookup {
                Ok(resolved) => addrs.extend(resolved.map(|sa| sa.ip())),
                Err(e) => warn!("Failed to resolve peer host {}: {}", host, e),
            }
        }

        PeerAllowList::new(addrs)
    }
}

impl PeerPicker for HttpPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn Peer>> {
        let owner = self.ring.get(key)?;
        if owner == self.self_url {
            return None;
        }
        self.peers
            .get(owner)
            .map(|peer| Arc::clone(peer) as Arc<dyn Peer>)
    }
}

// == Key Encoding ==
/// Decodes a key received on the peer transport path.
pub fn decode_key(encoded: &str) -> Result<String> {
    let raw = hex::decode(encoded)
        .map_err(|e| RelayError::ParameterInvalid(format!("peer key is not hex: {}", e)))?;
    String::from_utf8(raw)
        .map_err(|_| RelayError::ParameterInvalid("peer key is not utf-8".to_string()))
}

fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn host_and_port(url: &str) -> Option<(String, u16)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed
        .host_str()?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = parsed.port_or_known_default()?;
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_node_pool_picks_nothing() {
        let pool = HttpPool::new("http://localhost:8585", &[], HttpClient::new()).unwrap();

        assert_eq!(pool.peer_count(), 0);
        assert!(pool.pick("objects|hosts|-|-").is_none());
    }

    #[test]
    fn test_self_in_peer_list_is_not_a_remote_peer() {
        let pool = HttpPool::new(
            "http://10.0.0.1:8585/",
            &urls(&["http://10.0.0.1:8585", "http://10.0.0.2:8585"]),
            HttpClient::new(),
        )
        .unwrap();

        assert_eq!(pool.self_url(), "http://10.0.0.1:8585");
        assert_eq!(pool.peer_count(), 1);
    }

    #[test]
    fn test_nodes_agree_on_ownership() {
        let all = urls(&["http://10.0.0.1:8585", "http://10.0.0.2:8585"]);
        let a = HttpPool::new("http://10.0.0.1:8585", &all, HttpClient::new()).unwrap();
        let b = HttpPool::new("http://10.0.0.2:8585", &all, HttpClient::new()).unwrap();

        let mut remote_from_a = 0;
        for i in 0..200 {
            let key = format!("dynamic_text|hosts|-|=host{}", i);
            let from_a = a.pick(&key).map(|p| p.url().to_string());
            let from_b = b.pick(&key).map(|p| p.url().to_string());

            // Exactly one of the two nodes treats the key as local
            match (from_a, from_b) {
                (None, Some(owner)) => assert_eq!(owner, "http://10.0.0.1:8585"),
                (Some(owner), None) => {
                    assert_eq!(owner, "http://10.0.0.2:8585");
                    remote_from_a += 1;
                }
                other => panic!("nodes disagree on {}: {:?}", key, other),
            }
        }
        assert!(remote_from_a > 0);
    }

    #[test]
    fn test_entry_url_hex_encodes_key() {
        let peer = HttpPeer::new("http://10.0.0.2:8585", HttpClient::new()).unwrap();
        let url = peer.entry_url("icinga", "a|b/c").unwrap();

        assert_eq!(
            url.as_str(),
            "http://10.0.0.2:8585/_cache_internal/icinga/617c622f63"
        );
        assert_eq!(decode_key("617c622f63").unwrap(), "a|b/c");
    }

    #[test]
    fn test_decode_key_rejects_garbage() {
        assert!(decode_key("zz").is_err());
        assert!(decode_key("ff").is_err());
    }

    #[tokio::test]
    async fn test_peer_fetch_returns_owner_body() {
        let mut server = mockito::Server::new_async().await;
        let key = "check_state|service|=service.state==2|-";
        let mock = server
            .mock("GET", format!("/_cache_internal/icinga/{}", hex::encode(key)).as_str())
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(r#"{"results":[]}"#)
            .create_async()
            .await;

        let peer = HttpPeer::new(&server.url(), HttpClient::new()).unwrap();
        let body = peer.fetch("icinga", key).await.unwrap();

        assert_eq!(body, Bytes::from_static(br#"{"results":[]}"#));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_peer_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":"Peer rejected: 10.0.0.9"}"#)
            .create_async()
            .await;

        let peer = HttpPeer::new(&server.url(), HttpClient::new()).unwrap();
        let err = peer.fetch("icinga", "objects|hosts|-|-").await.unwrap_err();

        assert!(matches!(err, RelayError::PeerFetch(ref msg) if msg.contains("403")));
    }

    #[tokio::test]
    async fn test_peer_fetch_unreachable() {
        // Port 9 (discard) is closed on test machines
        let peer = HttpPeer::new("http://127.0.0.1:9", HttpClient::new()).unwrap();

        let err = peer.fetch("icinga", "objects|hosts|-|-").await.unwrap_err();
        assert!(matches!(err, RelayError::PeerFetch(_)));
    }

    #[tokio::test]
    async fn test_peer_fetch_timeout() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                std::io::Write::write_all(w, b"{}")
            })
            .create_async()
            .await;

        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap();
        let peer = HttpPeer::new(&server.url(), http).unwrap();

        let err = peer.fetch("icinga", "objects|hosts|-|-").await.unwrap_err();
        assert!(matches!(err, RelayError::PeerFetch(_)));
    }

    #[tokio::test]
    async fn test_allow_list_resolves_host_names() {
        let pool = HttpPool::new(
            "http://localhost:8585",
            &urls(&["http://unresolvable.invalid:8585"]),
            HttpClient::new(),
        )
        .unwrap();

        let allow = pool.resolve_allow_list().await;
        assert!(
            allow.contains(&"127.0.0.1".parse().unwrap()) || allow.contains(&"::1".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_allow_list_from_literal_addresses() {
        let pool = HttpPool::new(
            "http://127.0.0.1:8585",
            &urls(&["http://10.0.0.2:8585", "http://[::1]:8586"]),
            HttpClient::new(),
        )
        .unwrap();

        let allow = pool.resolve_allow_list().await;
        assert!(allow.contains(&"127.0.0.1".parse().unwrap()));
        assert!(allow.contains(&"10.0.0.2".parse().unwrap()));
        assert!(allow.contains(&"::1".parse().unwrap()));
        assert!(!allow.contains(&"10.0.0.3".parse().unwrap()));
    }
}
