//! Top-level entry point for shard routing.

use crate::connection::ConnectionRegistry;
use crate::dispatcher::ShardDispatcher;
use crate::mapping::ShardMapping;
use crate::shard::{Shard, ShardCollection};
use shardkit_core::config::{MappingConfig, ShardingConfig};
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::{MappingId, NodeId};
use std::sync::Arc;
use tracing::info;

/// Registry of mapping definitions and factory for mappings and shards.
///
/// Build one per application and share it, usually as `Arc<ShardManager>`.
///
/// ```
/// use shardkit_core::prelude::*;
/// use shardkit_distributed::connection::StaticRegistry;
/// use shardkit_distributed::ShardManager;
/// use std::sync::Arc;
///
/// let config = ShardingConfig::default().with_mapping(
///     MappingConfig::new("M_store_id", HashStrategy::Ring)
///         .with_node(NodeConfig::new("node1"))
///         .with_node(NodeConfig::new("node2")),
/// );
/// let manager = ShardManager::new(config, Arc::new(StaticRegistry::new())).unwrap();
///
/// let shard = manager.dispatcher().route_write("M_store_id", "42").unwrap();
/// assert!(["node1", "node2"].contains(&shard.node_id().as_str()));
/// ```
pub struct ShardManager {
    config: ShardingConfig,
    registry: Arc<dyn ConnectionRegistry>,
}

impl ShardManager {
    /// Validate the configuration. Mappings are built on demand.
    pub fn new(config: ShardingConfig, registry: Arc<dyn ConnectionRegistry>) -> ShardResult<Self> {
        config.validate()?;
        info!("Shard manager ready with {} mapping(s)", config.mappings.len());

        Ok(Self { config, registry })
    }

    /// A freshly built mapping for an id.
    ///
    /// Each call gets its own shards, so connections resolved through one
    /// request are never handed to the next.
    pub fn load_shard_mapping(&self, id: impl Into<MappingId>) -> ShardResult<ShardMapping> {
        let id = id.into();
        let config = self
            .config
            .mapping(&id)
            .ok_or(ShardError::UnknownMapping(id))?;
        ShardMapping::new(config.clone(), Arc::clone(&self.registry))
    }

    /// A bare shard outside any mapping, reading and writing the source
    /// named after the node.
    pub fn load_shard(&self, node_id: impl Into<NodeId>) -> Shard {
        Shard::bare(node_id.into(), Arc::clone(&self.registry))
    }

    /// Every shard of a mapping in configured node order.
    pub fn load_shard_collection_of(&self, id: impl Into<MappingId>) -> ShardResult<ShardCollection> {
        Ok(self.load_shard_mapping(id)?.all_shards())
    }

    pub fn has_shard_mapping(&self, id: &MappingId) -> bool {
        self.config.mapping(id).is_some()
    }

    /// Register another mapping. An id already in use is rejected.
    pub fn add_shard_mapping(&mut self, mapping: MappingConfig) -> ShardResult<()> {
        if self.has_shard_mapping(&mapping.id) {
            return Err(ShardError::invalid_config(format!(
                "mapping '{}' is defined more than once",
                mapping.id
            )));
        }

        mapping.validate()?;
        info!("Registered mapping {}", mapping.id);
        self.config.mappings.push(mapping);
        Ok(())
    }

    /// Mapping ids, sorted.
    pub fn mapping_ids(&self) -> Vec<MappingId> {
        let mut ids: Vec<MappingId> = self.config.mappings.iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids
    }

    /// The configuration this manager was built from, plus added mappings.
    pub fn config(&self) -> &ShardingConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Routing helper borrowing this manager.
    pub fn dispatcher(&self) -> ShardDispatcher<'_> {
        ShardDispatcher::new(self)
    }
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("mappings", &self.mapping_ids())
            .finish()
    }
}
