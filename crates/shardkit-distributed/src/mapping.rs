//! A single named partitioning scheme.

use crate::connection::ConnectionRegistry;
use crate::hashing::{build_hasher, KeyHasher};
use crate::shard::{Shard, ShardCollection};
use shardkit_core::config::{HashStrategy, MappingConfig, NodeConfig};
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::{MappingId, NodeId};
use std::sync::Arc;
use tracing::{debug, info};

/// Node set and hasher of one mapping.
///
/// Shards are built on every call that returns one, so each request gets
/// its own connection handles from the registry.
pub struct ShardMapping {
    config: MappingConfig,
    hasher: Box<dyn KeyHasher>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl ShardMapping {
    /// Build a mapping from validated configuration.
    pub fn new(config: MappingConfig, registry: Arc<dyn ConnectionRegistry>) -> ShardResult<Self> {
        let hasher = build_hasher(&config)?;
        debug!(
            "Loaded mapping {} ({} hashing, {} nodes)",
            config.id,
            config.hash,
            config.nodes.len()
        );

        Ok(Self {
            config,
            hasher,
            registry,
        })
    }

    pub fn id(&self) -> &MappingId {
        &self.config.id
    }

    pub fn strategy(&self) -> HashStrategy {
        self.hasher.strategy()
    }

    /// The hasher backing this mapping.
    pub fn hasher(&self) -> &dyn KeyHasher {
        self.hasher.as_ref()
    }

    /// Resolve a shard key to its node id.
    pub fn resolve(&self, key: impl AsRef<[u8]>) -> ShardResult<NodeId> {
        self.hasher.resolve(key.as_ref())
    }

    /// Resolve a shard key straight to its shard.
    pub fn resolve_shard(&self, key: impl AsRef<[u8]>) -> ShardResult<Arc<Shard>> {
        let node_id = self.resolve(key)?;
        self.load_shard(&node_id)
    }

    /// A fresh shard for a node in this mapping.
    pub fn load_shard(&self, node_id: &NodeId) -> ShardResult<Arc<Shard>> {
        self.config
            .node(node_id)
            .map(|node| self.build_shard(node))
            .ok_or_else(|| ShardError::unknown_node(self.id().clone(), node_id.clone()))
    }

    /// Fresh shards for every node, in configured node order.
    pub fn all_shards(&self) -> ShardCollection {
        self.config.nodes.iter().map(|node| self.build_shard(node)).collect()
    }

    pub fn has_node(&self, node_id: &NodeId) -> bool {
        self.config.node(node_id).is_some()
    }

    /// Node ids in configured order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.config.node_ids()
    }

    fn build_shard(&self, node: &NodeConfig) -> Arc<Shard> {
        Arc::new(Shard::from_config(node, Arc::clone(&self.registry)))
    }

    /// Add a node to the mapping.
    ///
    /// Only keys landing on the new node's ring arcs change owner.
    pub fn add_node(&mut self, node: NodeConfig) -> ShardResult<()> {
        node.validate()?;
        if self.has_node(&node.id) {
            return Err(ShardError::invalid_config(format!(
                "node '{}' already exists in mapping '{}'",
                node.id,
                self.id()
            )));
        }

        self.hasher.add_node(&node.id, node.weight);
        info!(
            "Added node {} (weight {}) to mapping {}",
            node.id,
            node.weight,
            self.id()
        );
        self.config.nodes.push(node);
        Ok(())
    }

    /// Remove a node from the mapping.
    ///
    /// Keys of other nodes keep their owner.
    pub fn remove_node(&mut self, node_id: &NodeId) -> ShardResult<()> {
        if !self.has_node(node_id) {
            return Err(ShardError::unknown_node(self.id().clone(), node_id.clone()));
        }

        self.hasher.remove_node(node_id);
        self.config.nodes.retain(|n| &n.id != node_id);
        info!("Removed node {} from mapping {}", node_id, self.id());
        Ok(())
    }

    /// Current configuration, including in-memory topology changes.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }
}

impl std::fmt::Debug for ShardMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardMapping")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StaticRegistry;
    use shardkit_core::types::SourceId;

    fn store_mapping() -> ShardMapping {
        let config = MappingConfig::new("M_store_id", HashStrategy::Ring)
            .with_node(NodeConfig::new("node1"))
            .with_node(NodeConfig::new("node2").with_read_source("node2_replica"))
            .with_node(NodeConfig::new("node3").with_weight(2));
        ShardMapping::new(config, Arc::new(StaticRegistry::new())).unwrap()
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mapping = store_mapping();
        for i in 0..100 {
            let key = i.to_string();
            assert_eq!(mapping.resolve(&key).unwrap(), mapping.resolve(&key).unwrap());
        }
    }

    #[test]
    fn test_resolve_shard_matches_resolve() {
        let mapping = store_mapping();
        let shard = mapping.resolve_shard("42").unwrap();
        assert_eq!(shard.node_id(), &mapping.resolve("42").unwrap());
    }

    #[test]
    fn test_load_shard_uses_configured_sources() {
        let mapping = store_mapping();
        let shard = mapping.load_shard(&NodeId::from("node2")).unwrap();
        assert_eq!(shard.read_source(), &SourceId::from("node2_replica"));
        assert_eq!(shard.write_source(), &SourceId::from("node2"));

        // Every load builds its own shard
        let again = mapping.load_shard(&NodeId::from("node2")).unwrap();
        assert!(!Arc::ptr_eq(&shard, &again));
    }

    #[test]
    fn test_load_unknown_shard() {
        let mapping = store_mapping();
        let err = mapping.load_shard(&NodeId::from("node9")).unwrap_err();
        assert_eq!(err, ShardError::unknown_node("M_store_id", "node9"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_all_shards_in_config_order() {
        let mapping = store_mapping();
        assert_eq!(
            mapping.all_shards().node_ids(),
            vec![NodeId::from("node1"), NodeId::from("node2"), NodeId::from("node3")]
        );
    }

    #[test]
    fn test_add_and_remove_node() {
        let mut mapping = store_mapping();
        mapping.add_node(NodeConfig::new("node4")).unwrap();
        assert!(mapping.has_node(&NodeId::from("node4")));
        assert_eq!(mapping.config().nodes.len(), 4);
        assert_eq!(mapping.hasher().node_count(), 4);

        mapping.remove_node(&NodeId::from("node1")).unwrap();
        assert!(!mapping.has_node(&NodeId::from("node1")));
        assert_eq!(
            mapping.node_ids(),
            vec![NodeId::from("node2"), NodeId::from("node3"), NodeId::from("node4")]
        );
        assert!(mapping.config().node(&NodeId::from("node1")).is_none());
    }

    #[test]
    fn test_add_node_rejects_duplicates_and_zero_weight() {
        let mut mapping = store_mapping();
        assert!(matches!(
            mapping.add_node(NodeConfig::new("node1")),
            Err(ShardError::InvalidConfig(_))
        ));
        assert!(matches!(
            mapping.add_node(NodeConfig::new("node5").with_weight(0)),
            Err(ShardError::InvalidConfig(_))
        ));
        assert_eq!(mapping.node_ids().len(), 3);
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut mapping = store_mapping();
        assert_eq!(
            mapping.remove_node(&NodeId::from("ghost")),
            Err(ShardError::unknown_node("M_store_id", "ghost"))
        );
    }

    #[test]
    fn test_empty_mapping_fails_to_resolve() {
        let config = MappingConfig::new("M_empty", HashStrategy::Modulo);
        let mapping = ShardMapping::new(config, Arc::new(StaticRegistry::new())).unwrap();
        assert_eq!(mapping.resolve("1"), Err(ShardError::EmptyRing));
        assert!(mapping.all_shards().is_empty());
    }
}
