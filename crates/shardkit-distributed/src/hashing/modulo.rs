//! Static modulo hashing.

use super::{hash_key, KeyHasher};
use shardkit_core::config::HashStrategy;
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::NodeId;

/// Routes a key to `nodes[hash(key) % nodes.len()]` over sorted node ids.
///
/// Weights are ignored. Any topology change re-derives the sorted list and
/// remaps most keys; use this only for node sets that never change.
#[derive(Debug, Clone, Default)]
pub struct ModuloHasher {
    nodes: Vec<NodeId>,
}

impl ModuloHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyHasher for ModuloHasher {
    fn resolve(&self, key: &[u8]) -> ShardResult<NodeId> {
        if self.nodes.is_empty() {
            return Err(ShardError::EmptyRing);
        }
        let index = hash_key(key) % self.nodes.len() as u64;
        Ok(self.nodes[index as usize].clone())
    }

    fn add_node(&mut self, node_id: &NodeId, _weight: u32) {
        if let Err(pos) = self.nodes.binary_search(node_id) {
            self.nodes.insert(pos, node_id.clone());
        }
    }

    fn remove_node(&mut self, node_id: &NodeId) -> bool {
        match self.nodes.binary_search(node_id) {
            Ok(pos) => {
                self.nodes.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.clone()
    }

    fn strategy(&self) -> HashStrategy {
        HashStrategy::Modulo
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
