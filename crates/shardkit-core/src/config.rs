//! Sharding configuration.
//!
//! The `[[mappings]]` section of an application config describes every
//! partitioning scheme: its hash strategy and the nodes it spreads keys
//! over. Configuration is validated up front so malformed entries fail at
//! load time rather than on first use.
//!
//! ```toml
//! [[mappings]]
//! id = "M_store_id"
//! hash = "ring"
//!
//! [[mappings.nodes]]
//! id = "node1"
//! weight = 2
//! read = "node1_replica"
//! write = "node1"
//! ```

use crate::error::{ShardError, ShardResult};
use crate::types::{MappingId, NodeId, SourceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Virtual points per unit of weight on a consistent-hash ring.
pub const DEFAULT_REPLICAS: u32 = 64;

/// Largest accepted node weight.
pub const MAX_WEIGHT: u32 = 1024;

/// Largest accepted replica factor. Together with [`MAX_WEIGHT`] this bounds
/// a node's virtual points on the ring.
pub const MAX_REPLICAS: u32 = 1024;

/// Key to node assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    /// Consistent hashing with weighted virtual points.
    #[default]
    Ring,
    /// `hash(key) mod node_count`; remaps most keys on topology change.
    Modulo,
}

impl std::fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashStrategy::Ring => write!(f, "ring"),
            HashStrategy::Modulo => write!(f, "modulo"),
        }
    }
}

/// One node of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: NodeId,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Source id for read connections; the node id when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<SourceId>,
    /// Source id for write connections; the node id when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<SourceId>,
}

/// A named partitioning scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub id: MappingId,
    #[serde(default)]
    pub hash: HashStrategy,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// All mappings known to a shard manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingConfig {
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

fn default_weight() -> u32 { 1 }
fn default_replicas() -> u32 { DEFAULT_REPLICAS }

impl NodeConfig {
    /// A node with weight 1 whose sources are its own id.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            weight: default_weight(),
            read: None,
            write: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_read_source(mut self, source: impl Into<SourceId>) -> Self {
        self.read = Some(source.into());
        self
    }

    pub fn with_write_source(mut self, source: impl Into<SourceId>) -> Self {
        self.write = Some(source.into());
        self
    }

    /// Source id used to obtain the read connection.
    pub fn read_source(&self) -> SourceId {
        self.read
            .clone()
            .unwrap_or_else(|| SourceId::new(self.id.as_str()))
    }

    /// Source id used to obtain the write connection.
    pub fn write_source(&self) -> SourceId {
        self.write
            .clone()
            .unwrap_or_else(|| SourceId::new(self.id.as_str()))
    }

    /// Check this node in isolation.
    pub fn validate(&self) -> ShardResult<()> {
        if self.id.is_empty() {
            return Err(ShardError::invalid_config("node id must not be empty"));
        }
        if self.weight == 0 {
            return Err(ShardError::invalid_config(format!(
                "node '{}' must have a positive weight",
                self.id
            )));
        }
        if self.weight > MAX_WEIGHT {
            return Err(ShardError::invalid_config(format!(
                "node '{}' has weight {} above the maximum of {}",
                self.id, self.weight, MAX_WEIGHT
            )));
        }
        for source in [&self.read, &self.write].into_iter().flatten() {
            if source.is_empty() {
                return Err(ShardError::invalid_config(format!(
                    "node '{}' has an empty source id",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

impl MappingConfig {
    /// An empty mapping with the default replica factor.
    pub fn new(id: impl Into<MappingId>, hash: HashStrategy) -> Self {
        Self {
            id: id.into(),
            hash,
            replicas: default_replicas(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Node ids in configured order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Check ids, weights and the replica factor.
    ///
    /// A mapping without nodes is accepted; resolving a key on it fails
    /// with [`ShardError::EmptyRing`].
    pub fn validate(&self) -> ShardResult<()> {
        if self.id.is_empty() {
            return Err(ShardError::invalid_config("mapping id must not be empty"));
        }
        if self.replicas == 0 {
            return Err(ShardError::invalid_config(format!(
                "mapping '{}' must have a positive replica factor",
                self.id
            )));
        }
        if self.replicas > MAX_REPLICAS {
            return Err(ShardError::invalid_config(format!(
                "mapping '{}' has replica factor {} above the maximum of {}",
                self.id, self.replicas, MAX_REPLICAS
            )));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            node.validate()?;
            if !seen.insert(&node.id) {
                return Err(ShardError::invalid_config(format!(
                    "mapping '{}' lists node '{}' more than once",
                    self.id, node.id
                )));
            }
        }
        Ok(())
    }
}

impl ShardingConfig {
    pub fn with_mapping(mut self, mapping: MappingConfig) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn mapping(&self, id: &MappingId) -> Option<&MappingConfig> {
        self.mappings.iter().find(|m| &m.id == id)
    }

    /// Validate every mapping and reject duplicate mapping ids.
    pub fn validate(&self) -> ShardResult<()> {
        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            mapping.validate()?;
            if !seen.insert(&mapping.id) {
                return Err(ShardError::invalid_config(format!(
                    "mapping '{}' is defined more than once",
                    mapping.id
                )));
            }
        }
        Ok(())
    }
}
