//! Consistent hash ring mapping cache keys to peer URLs.

use sha2::{Digest, Sha256};

/// Virtual points placed on the ring per node
pub const DEFAULT_REPLICAS: usize = 50;

// == Hash Ring ==
/// Consistent hash ring with virtual replicas.
///
/// Points are the first four bytes of a SHA-256 digest, so every node builds
/// the same ring from the same list regardless of platform or build.
#[derive(Debug, Clone)]
pub struct HashRing {
    replicas: usize,
    /// Sorted (point, node index) pairs
    points: Vec<(u32, usize)>,
    nodes: Vec<String>,
}

impl HashRing {
    pub fn new(replicas: usize) -> Self {
        Self {
            replicas: replicas.max(1),
            points: Vec::new(),
            nodes: Vec::new(),
        }
    }

    // == Add ==
    /// Adds nodes to the ring. Duplicate node names are ignored.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            let node = node.into();
            if self.nodes.contains(&node) {
                continue;
            }

            let index = self.nodes.len();
            for replica in 0..self.replicas {
                let point = hash_point(format!("{}{}", replica, node).as_bytes());
                self.points.push((point, index));
            }
            self.nodes.push(node);
        }

        self.points.sort_unstable();
    }

    // == Get ==
    /// Returns the node owning `key`, or `None` for an empty ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }

        let point = hash_point(key.as_bytes());
        let idx = self.points.partition_point(|(p, _)| *p < point);
        let (_, node) = self.points[idx % self.points.len()];

        Some(self.nodes[node].as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}

fn hash_point(data: &[u8]) -> u32 {
    let digest = Sha256::digest(data);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
