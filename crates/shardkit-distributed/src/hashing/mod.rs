//! Key to node assignment strategies.
//!
//! Two strategies are provided:
//!
//! - [`ConsistentHashRing`] places weighted virtual points for every node on
//!   a `u64` circle. Adding or removing a node only moves the keys that land
//!   on that node's arcs.
//! - [`ModuloHasher`] takes `hash(key) mod node_count` over the sorted node
//!   ids. Cheap, but a topology change remaps most keys, so it suits fixed
//!   node sets only.
//!
//! Both hash with xxh3, which is stable across processes, platforms and
//! compiler versions: a key resolves to the same node after a restart.

mod modulo;
mod ring;

pub use modulo::ModuloHasher;
pub use ring::ConsistentHashRing;

use shardkit_core::config::{HashStrategy, MappingConfig};
use shardkit_core::error::ShardResult;
use shardkit_core::types::NodeId;
use xxhash_rust::xxh3::xxh3_64;

/// A strategy resolving shard keys to node ids.
pub trait KeyHasher: Send + Sync + std::fmt::Debug {
    /// Resolve a key to the node that owns it.
    ///
    /// Fails with [`ShardError::EmptyRing`](shardkit_core::error::ShardError::EmptyRing)
    /// when no nodes are registered.
    fn resolve(&self, key: &[u8]) -> ShardResult<NodeId>;

    /// Register a node. Re-adding a known node replaces its weight.
    fn add_node(&mut self, node_id: &NodeId, weight: u32);

    /// Unregister a node. Returns `false` if it was not registered.
    fn remove_node(&mut self, node_id: &NodeId) -> bool;

    /// Registered node ids, sorted.
    fn node_ids(&self) -> Vec<NodeId>;

    fn strategy(&self) -> HashStrategy;

    fn node_count(&self) -> usize {
        self.node_ids().len()
    }
}

/// Build the hasher a mapping is configured with, loaded with its nodes.
///
/// The configuration is validated first, so a zero replica factor or
/// weight is an [`InvalidConfig`](shardkit_core::error::ShardError::InvalidConfig)
/// error rather than a panic.
pub fn build_hasher(config: &MappingConfig) -> ShardResult<Box<dyn KeyHasher>> {
    config.validate()?;

    let mut hasher: Box<dyn KeyHasher> = match config.hash {
        HashStrategy::Ring => Box::new(ConsistentHashRing::with_replicas(config.replicas)),
        HashStrategy::Modulo => Box::new(ModuloHasher::new()),
    };
    for node in &config.nodes {
        hasher.add_node(&node.id, node.weight);
    }
    Ok(hasher)
}

/// Hash a shard key to its position.
pub(crate) fn hash_key(key: &[u8]) -> u64 {
    xxh3_64(key)
}

/// Hash the `replica`-th virtual point of a node.
pub(crate) fn hash_point(node_id: &NodeId, replica: u64) -> u64 {
    xxh3_64(format!("{}:{}", node_id, replica).as_bytes())
}
