//! The Kademlia routing table: 160 k-buckets indexed by XOR distance from
//! the local id, bucket 0 nearest (differing only in the lowest bit) and
//! bucket 159 farthest (differing in the highest bit).

use std::collections::VecDeque;
use std::sync::Mutex;

use kdht_core::id::{distance, distance_bucket, KEY_BITS};
use kdht_core::{Error, Id, NodeInfo, Result};

/// A single k-bucket: up to `k` nodes, least-recently-seen at the front.
struct KBucket {
    k: usize,
    nodes: VecDeque<NodeInfo>,
}

impl KBucket {
    fn new(k: usize) -> Self {
        Self {
            k,
            nodes: VecDeque::with_capacity(k),
        }
    }

    /// Insert `node`, or move it to the back if already present. Returns
    /// `false` if the bucket is full and `node` is new.
    fn insert(&mut self, node: NodeInfo) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| n == &node) {
            self.nodes.remove(pos);
            self.nodes.push_back(node);
            return true;
        }
        if self.nodes.len() >= self.k {
            return false;
        }
        self.nodes.push_back(node);
        true
    }

    fn remove(&mut self, id: &Id) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| n.id() == id) {
            self.nodes.remove(pos);
            true
        } else {
            false
        }
    }

    fn lookup(&self, id: &Id) -> Option<NodeInfo> {
        self.nodes.iter().find(|n| n.id() == id).cloned()
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct Inner {
    local: NodeInfo,
    k: usize,
    buckets: Vec<KBucket>,
}

/// A routing table for a single local node, safe for concurrent use.
///
/// Mirrors the bucket layout and operation set of the original project's
/// `RoutingTable` interface: `K`, `InsertNode`, `RemoveNode`, `Lookup`,
/// `GetNodes`, `ClosestK`, `Buckets`.
pub struct RoutingTable {
    inner: Mutex<Inner>,
}

impl RoutingTable {
    pub fn new(local: NodeInfo, k: usize) -> Self {
        let buckets = (0..KEY_BITS).map(|_| KBucket::new(k)).collect();
        Self {
            inner: Mutex::new(Inner {
                local,
                k,
                buckets,
            }),
        }
    }

    /// The `k` parameter this table was constructed with.
    pub fn k(&self) -> usize {
        self.inner.lock().unwrap().k
    }

    fn bucket_for(inner: &Inner, id: &Id) -> usize {
        distance_bucket(&distance(inner.local.id(), id))
    }

    /// Insert or refresh `node`. No-op if the owning bucket is full and
    /// `node` is not already present, and a no-op for the local id itself.
    pub fn insert_node(&self, node: NodeInfo) {
        let mut inner = self.inner.lock().unwrap();
        if node.id() == inner.local.id() {
            return;
        }
        let idx = Self::bucket_for(&inner, node.id());
        inner.buckets[idx].insert(node);
    }

    /// Remove the node with the given id. Fails with `InvalidNode` if the
    /// id is absent, or if it names the local node.
    pub fn remove_node(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if id == inner.local.id() {
            return Err(Error::InvalidNode);
        }
        let idx = Self::bucket_for(&inner, id);
        if inner.buckets[idx].remove(id) {
            Ok(())
        } else {
            Err(Error::InvalidNode)
        }
    }

    /// Look up a known node by id.
    pub fn lookup(&self, id: &Id) -> Option<NodeInfo> {
        let inner = self.inner.lock().unwrap();
        if id == inner.local.id() {
            return Some(inner.local.clone());
        }
        let idx = Self::bucket_for(&inner, id);
        inner.buckets[idx].lookup(id)
    }

    /// The raw contents of bucket `bucket` (0 = nearest, 159 = farthest).
    pub fn get_nodes(&self, bucket: usize) -> Vec<NodeInfo> {
        let inner = self.inner.lock().unwrap();
        inner
            .buckets
            .get(bucket)
            .map(|b| b.nodes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The `k` nodes (including the local node) closest to `target`.
    ///
    /// Never empty: the local node is always a candidate.
    pub fn closest_k(&self, target: &Id) -> Vec<NodeInfo> {
        let inner = self.inner.lock().unwrap();
        let k = inner.k;

        let mut all: Vec<NodeInfo> = inner.buckets.iter().flat_map(|b| b.nodes.iter().cloned()).collect();
        all.push(inner.local.clone());

        all.sort_by(|a, b| {
            let da = distance(a.id(), target);
            let db = distance(b.id(), target);
            da.cmp(&db)
        });
        all.truncate(k);
        all
    }

    /// Number of non-empty buckets, counted from 159 down.
    pub fn buckets(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().filter(|b| !b.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdht_core::id::KEY_BYTES;

    fn node(byte: u8) -> NodeInfo {
        let mut id = [0u8; KEY_BYTES];
        id[0] = byte;
        NodeInfo::new(id, format!("127.0.0.1:{}", byte))
    }

    #[test]
    fn closest_k_always_includes_local() {
        let table = RoutingTable::new(node(0x10), 2);
        let target = [0u8; KEY_BYTES];
        let closest = table.closest_k(&target);
        assert_eq!(closest.len(), 1);
        assert_eq!(closest[0].id(), node(0x10).id());
    }

    #[test]
    fn insert_then_lookup() {
        let table = RoutingTable::new(node(0x10), 2);
        table.insert_node(node(0x20));
        assert_eq!(table.lookup(node(0x20).id()), Some(node(0x20)));
        assert_eq!(table.lookup(&[0xffu8; KEY_BYTES]), None);
    }

    #[test]
    fn insert_self_is_noop() {
        let table = RoutingTable::new(node(0x10), 2);
        table.insert_node(node(0x10));
        assert_eq!(table.buckets(), 0);
    }

    #[test]
    fn bucket_full_drops_new_node() {
        let table = RoutingTable::new(node(0x10), 1);
        // node(0x30) and node(0x40) differ from node(0x10) by the same
        // high bit, landing in the same bucket.
        table.insert_node(node(0x30));
        table.insert_node(node(0x40));
        assert_eq!(table.lookup(node(0x30).id()), Some(node(0x30)));
        assert_eq!(table.lookup(node(0x40).id()), None);
    }

    #[test]
    fn remove_node_reports_invalid_for_unknown_id() {
        let table = RoutingTable::new(node(0x10), 2);
        assert!(matches!(table.remove_node(&[0xffu8; KEY_BYTES]), Err(Error::InvalidNode)));
    }

    #[test]
    fn remove_node_rejects_local_id() {
        let table = RoutingTable::new(node(0x10), 2);
        assert!(matches!(table.remove_node(node(0x10).id()), Err(Error::InvalidNode)));
    }

    #[test]
    fn buckets_counts_only_non_empty() {
        let table = RoutingTable::new(node(0x10), 2);
        assert_eq!(table.buckets(), 0);
        table.insert_node(node(0x20));
        assert_eq!(table.buckets(), 1);
    }
}
