//! Consistent hash ring with weighted virtual points.

use super::{hash_key, hash_point, KeyHasher};
use shardkit_core::config::{HashStrategy, DEFAULT_REPLICAS};
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::NodeId;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A consistent hash ring for routing keys to nodes.
///
/// Every node owns `weight × replicas` virtual points on the `u64` circle,
/// placed at `xxh3("{node_id}:{index}")`. A key belongs to the first point
/// at or after its own hash, wrapping around past the end.
///
/// Points are stored as `(position, node)` pairs, so two nodes colliding on
/// one position both keep their point and the smaller node id wins lookups.
/// The ring is therefore a pure function of its node set: the order in
/// which nodes were added or removed never matters.
///
/// # Example
///
/// ```
/// use shardkit_distributed::hashing::{ConsistentHashRing, KeyHasher};
/// use shardkit_core::types::NodeId;
///
/// let mut ring = ConsistentHashRing::new();
/// ring.add_node(&NodeId::from("node1"), 1);
/// ring.add_node(&NodeId::from("node2"), 1);
///
/// let owner = ring.resolve(b"store:42").unwrap();
/// assert_eq!(owner, ring.resolve(b"store:42").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ConsistentHashRing {
    /// Virtual points ordered by position, then node id.
    points: BTreeSet<(u64, NodeId)>,
    /// Weight of every registered node.
    weights: BTreeMap<NodeId, u32>,
    /// Virtual points per unit of weight.
    replicas: u32,
}

impl ConsistentHashRing {
    /// Create an empty ring with [`DEFAULT_REPLICAS`] points per unit of weight.
    pub fn new() -> Self {
        Self::with_replicas(DEFAULT_REPLICAS)
    }

    /// Create an empty ring with a custom replica factor.
    ///
    /// More replicas smooth the key distribution at the cost of memory and
    /// slightly slower topology changes.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    pub fn with_replicas(replicas: u32) -> Self {
        assert!(replicas > 0, "Replica factor must be greater than 0");

        Self {
            points: BTreeSet::new(),
            weights: BTreeMap::new(),
            replicas,
        }
    }

    /// Virtual points per unit of weight.
    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Total number of virtual points on the ring.
    pub fn virtual_points(&self) -> usize {
        self.points.len()
    }

    /// Number of virtual points owned by a node.
    pub fn points_of(&self, node_id: &NodeId) -> usize {
        self.points.iter().filter(|(_, owner)| owner == node_id).count()
    }

    pub fn weight_of(&self, node_id: &NodeId) -> Option<u32> {
        self.weights.get(node_id).copied()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.weights.contains_key(node_id)
    }

    /// Owner of a raw ring position: first point at or after it, wrapping.
    fn owner_of(&self, position: u64) -> Option<&NodeId> {
        self.points
            .range((position, NodeId(String::new()))..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, owner)| owner)
    }

    /// The first `count` distinct nodes clockwise from a key.
    ///
    /// The first entry is the key's owner; the rest are where replicas of
    /// the key would be placed. Returns fewer than `count` nodes when the
    /// ring has fewer nodes than that.
    pub fn successors(&self, key: &[u8], count: usize) -> Vec<NodeId> {
        let position = hash_key(key);
        let mut nodes = Vec::with_capacity(count.min(self.weights.len()));
        let mut seen = HashSet::new();

        let start = (position, NodeId(String::new()));
        for (_, owner) in self.points.range(start..).chain(self.points.iter()) {
            if nodes.len() >= count || seen.len() == self.weights.len() {
                break;
            }
            if seen.insert(owner) {
                nodes.push(owner.clone());
            }
        }

        nodes
    }
}

impl KeyHasher for ConsistentHashRing {
    fn resolve(&self, key: &[u8]) -> ShardResult<NodeId> {
        self.owner_of(hash_key(key))
            .cloned()
            .ok_or(ShardError::EmptyRing)
    }

    fn add_node(&mut self, node_id: &NodeId, weight: u32) {
        if self.contains(node_id) {
            self.remove_node(node_id);
        }

        let count = u64::from(weight) * u64::from(self.replicas);
        for replica in 0..count {
            self.points.insert((hash_point(node_id, replica), node_id.clone()));
        }
        self.weights.insert(node_id.clone(), weight);
    }

    fn remove_node(&mut self, node_id: &NodeId) -> bool {
        if self.weights.remove(node_id).is_none() {
            return false;
        }
        self.points.retain(|(_, owner)| owner != node_id);
        true
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.weights.keys().cloned().collect()
    }

    fn strategy(&self) -> HashStrategy {
        HashStrategy::Ring
    }

    fn node_count(&self) -> usize {
        self.weights.len()
    }
}

impl Default for ConsistentHashRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(nodes: &[&str]) -> ConsistentHashRing {
        let mut ring = ConsistentHashRing::new();
        for node in nodes {
            ring.add_node(&NodeId::from(*node), 1);
        }
        ring
    }

    fn keys(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("store:{}", i)).collect()
    }

    fn assignments(ring: &ConsistentHashRing, keys: &[String]) -> Vec<NodeId> {
        keys.iter()
            .map(|k| ring.resolve(k.as_bytes()).unwrap())
            .collect()
    }

    #[test]
    fn test_new_ring() {
        let ring = ring_of(&["node1", "node2", "node3"]);
        assert_eq!(ring.node_count(), 3);
        assert_eq!(
            ring.virtual_points(),
            3 * DEFAULT_REPLICAS as usize
        );
        assert_eq!(ring.points_of(&NodeId::from("node2")), DEFAULT_REPLICAS as usize);
    }

    #[test]
    fn test_empty_ring_fails() {
        let ring = ConsistentHashRing::new();
        assert_eq!(ring.resolve(b"anything"), Err(ShardError::EmptyRing));
        assert!(ring.successors(b"anything", 2).is_empty());
    }

    #[test]
    fn test_single_node_owns_everything() {
        let ring = ring_of(&["only"]);
        for key in keys(50) {
            assert_eq!(ring.resolve(key.as_bytes()).unwrap(), NodeId::from("only"));
        }
    }

    #[test]
    fn test_consistency() {
        let ring = ring_of(&["node1", "node2", "node3"]);
        let first = assignments(&ring, &keys(200));
        let second = assignments(&ring, &keys(200));
        assert_eq!(first, second);
    }

    #[test]
    fn test_independent_of_insertion_order() {
        let forward = ring_of(&["node1", "node2", "node3"]);
        let backward = ring_of(&["node3", "node2", "node1"]);
        assert_eq!(assignments(&forward, &keys(500)), assignments(&backward, &keys(500)));
    }

    #[test]
    fn test_distribution() {
        let ring = ring_of(&["node1", "node2", "node3"]);

        let mut counts: BTreeMap<NodeId, u32> = BTreeMap::new();
        for node in assignments(&ring, &keys(3000)) {
            *counts.entry(node).or_insert(0) += 1;
        }

        // Each node should get roughly 1000 keys
        assert_eq!(counts.len(), 3);
        for count in counts.values() {
            assert!(
                *count >= 500 && *count <= 1500,
                "Distribution skewed: {:?}",
                counts
            );
        }
    }

    #[test]
    fn test_weight_scales_points() {
        let mut ring = ConsistentHashRing::with_replicas(16);
        ring.add_node(&NodeId::from("small"), 1);
        ring.add_node(&NodeId::from("large"), 3);
        assert_eq!(ring.points_of(&NodeId::from("small")), 16);
        assert_eq!(ring.points_of(&NodeId::from("large")), 48);
        assert_eq!(ring.weight_of(&NodeId::from("large")), Some(3));
    }

    #[test]
    fn test_readding_replaces_weight() {
        let mut ring = ConsistentHashRing::with_replicas(10);
        let node = NodeId::from("node1");
        ring.add_node(&node, 1);
        ring.add_node(&node, 2);
        assert_eq!(ring.points_of(&node), 20);
        assert_eq!(ring.node_count(), 1);
    }

    #[test]
    fn test_remove_moves_only_removed_nodes_keys() {
        let mut ring = ring_of(&["node1", "node2", "node3", "node4"]);
        let keys = keys(2000);
        let before = assignments(&ring, &keys);

        assert!(ring.remove_node(&NodeId::from("node2")));
        let after = assignments(&ring, &keys);

        for (old, new) in before.iter().zip(&after) {
            if old.as_str() == "node2" {
                assert_ne!(new.as_str(), "node2");
            } else {
                assert_eq!(old, new, "key moved off a surviving node");
            }
        }
        assert_eq!(ring.points_of(&NodeId::from("node2")), 0);
    }

    #[test]
    fn test_add_only_moves_keys_to_new_node() {
        let mut ring = ring_of(&["node1", "node2", "node3"]);
        let keys = keys(2000);
        let before = assignments(&ring, &keys);

        ring.add_node(&NodeId::from("node4"), 1);
        let after = assignments(&ring, &keys);

        let mut moved = 0;
        for (old, new) in before.iter().zip(&after) {
            if old != new {
                assert_eq!(new.as_str(), "node4");
                moved += 1;
            }
        }

        // Roughly a quarter of the keys should move to the new node
        assert!(moved > 0);
        assert!(moved <= 900, "Too many keys moved: {}", moved);
    }

    #[test]
    fn test_remove_then_add_restores_assignments() {
        let mut ring = ring_of(&["node1", "node2", "node3"]);
        let keys = keys(500);
        let before = assignments(&ring, &keys);

        ring.remove_node(&NodeId::from("node3"));
        ring.add_node(&NodeId::from("node3"), 1);
        assert_eq!(assignments(&ring, &keys), before);
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut ring = ring_of(&["node1"]);
        assert!(!ring.remove_node(&NodeId::from("ghost")));
        assert_eq!(ring.node_count(), 1);
    }

    #[test]
    fn test_successors() {
        let ring = ring_of(&["node1", "node2", "node3", "node4", "node5"]);

        let nodes = ring.successors(b"store:42", 3);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], ring.resolve(b"store:42").unwrap());

        // All successors should be unique
        let unique: HashSet<_> = nodes.iter().collect();
        assert_eq!(unique.len(), 3);

        // Asking for more than exist returns every node once
        assert_eq!(ring.successors(b"store:42", 10).len(), 5);
    }

    #[test]
    #[should_panic(expected = "Replica factor must be greater than 0")]
    fn test_zero_replicas_panics() {
        let _ = ConsistentHashRing::with_replicas(0);
    }

    #[test]
    fn test_default() {
        let ring = ConsistentHashRing::default();
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(ring.node_count(), 0);
    }
}
