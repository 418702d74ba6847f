//! Peers Module
//!
//! Routing of cache keys to the node that owns them. Ownership is decided by
//! a consistent-hash ring built from the same peer list on every node, so all
//! nodes agree on the owner of a key without talking to each other.

mod pool;
mod ring;

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use pool::{decode_key, HttpPeer, HttpPool, PEER_BASE_PATH};
pub use ring::{HashRing, DEFAULT_REPLICAS};

// == Peer ==
/// A remote node that can serve entries it owns.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Fetches `key` of `group` from this peer.
    async fn fetch(&self, group: &str, key: &str) -> Result<Bytes>;

    /// Identifier used in logs.
    fn url(&self) -> &str;
}

// == Peer Picker ==
/// Decides which node owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the owning peer, or `None` when this node owns `key`.
    fn pick(&self, key: &str) -> Option<Arc<dyn Peer>>;
}

// == No Peers ==
/// Single-node picker: this node owns every key.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick(&self, _key: &str) -> Option<Arc<dyn Peer>> {
        None
    }
}

// == Peer Allow List ==
/// Addresses allowed to use the internal peer transport.
#[derive(Debug, Default, Clone)]
pub struct PeerAllowList {
    addrs: HashSet<IpAddr>,
}

impl PeerAllowList {
    pub fn new<I>(addrs: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Self {
            addrs: addrs.into_iter().collect(),
        }
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.addrs.contains(addr) || self.addrs.contains(&canonical(addr))
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

/// IPv4-mapped IPv6 addresses compare as their IPv4 form.
fn canonical(addr: &IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(*v6)),
        v4 => *v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_peers_owns_everything() {
        assert!(NoPeers.pick("objects|hosts|-|-").is_none());
    }

    #[test]
    fn test_allow_list() {
        let allow = PeerAllowList::new(["10.0.0.1".parse().unwrap()]);

        assert!(allow.contains(&"10.0.0.1".parse().unwrap()));
        assert!(allow.contains(&"::ffff:10.0.0.1".parse().unwrap()));
        assert!(!allow.contains(&"10.0.0.2".parse().unwrap()));
        assert_eq!(allow.len(), 1);
    }

    #[test]
    fn test_empty_allow_list_rejects_all() {
        let allow = PeerAllowList::default();
        assert!(allow.is_empty());
        assert!(!allow.contains(&"127.0.0.1".parse().unwrap()));
    }
}
