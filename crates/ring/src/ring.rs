//! Immutable consistent-hash ring

use md5::{Digest, Md5};

use crate::endpoint::Endpoint;

/// Virtual nodes placed per endpoint.
///
/// 128 keeps the per-endpoint load standard deviation below ~10% for
/// fleet sizes in the 3-100 range.
pub const VIRTUAL_NODES: u32 = 128;

/// One virtual node: a position on the 2^32 key space and its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RingEntry {
    position: u32,
    endpoint: Endpoint,
}

/// Consistent-hash ring mapping routing keys to endpoints.
///
/// Each endpoint owns [`VIRTUAL_NODES`] positions at
/// `trunc32(md5("{endpoint}-{i}"))`. The ring is immutable after
/// construction; membership changes produce a new ring, and the caller
/// compares rings to detect a no-op update. Positions colliding in the
/// 32-bit space are kept; the first-placed endpoint wins lookups there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRing {
    entries: Vec<RingEntry>,
}

impl HashRing {
    /// Build a ring from a membership set.
    ///
    /// Cost is O(N * R log(N * R)); lookups afterwards allocate nothing.
    pub fn new(endpoints: &[Endpoint]) -> Self {
        let mut entries = Vec::with_capacity(endpoints.len() * VIRTUAL_NODES as usize);

        for endpoint in endpoints {
            for i in 0..VIRTUAL_NODES {
                entries.push(RingEntry {
                    position: trunc32_md5(format!("{endpoint}-{i}").as_bytes()),
                    endpoint: endpoint.clone(),
                });
            }
        }

        // Stable sort: position ties keep insertion order, so the
        // first-placed endpoint wins on 32-bit collisions.
        entries.sort_by_key(|e| e.position);

        Self { entries }
    }

    /// The endpoint owning `key`.
    ///
    /// Hashes the key onto the ring and walks clockwise to the first
    /// virtual node, wrapping past the top of the key space.
    ///
    /// # Panics
    ///
    /// Panics on an empty ring. Callers must not look up ownership before
    /// the first membership event has populated the ring.
    pub fn endpoint_for(&self, key: &[u8]) -> &Endpoint {
        assert!(!self.entries.is_empty(), "lookup on empty hash ring");

        let h = trunc32_md5(key);
        let idx = self.entries.partition_point(|e| e.position < h);
        let idx = if idx == self.entries.len() { 0 } else { idx };
        &self.entries[idx].endpoint
    }

    /// Whether the ring has no virtual nodes (empty membership)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of virtual nodes on the ring
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// First 4 md5 bytes as a big-endian u32
fn trunc32_md5(bytes: &[u8]) -> u32 {
    let digest = Md5::digest(bytes);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
