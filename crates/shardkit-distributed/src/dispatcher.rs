//! Key and broadcast routing on top of a [`ShardManager`].

use crate::manager::ShardManager;
use crate::shard::{Shard, ShardCollection};
use shardkit_core::error::ShardResult;
use shardkit_core::types::{MappingId, NodeId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Stateless router.
///
/// Reads and writes of one key go to the same shard; the caller picks the
/// shard's read or write connection.
#[derive(Debug, Clone, Copy)]
pub struct ShardDispatcher<'a> {
    manager: &'a ShardManager,
}

impl<'a> ShardDispatcher<'a> {
    pub fn new(manager: &'a ShardManager) -> Self {
        Self { manager }
    }

    /// Shard owning `key` for a write.
    pub fn route_write(
        &self,
        mapping: impl Into<MappingId>,
        key: impl AsRef<[u8]>,
    ) -> ShardResult<Arc<Shard>> {
        self.route(mapping.into(), key.as_ref())
    }

    /// Shard owning `key` for a read.
    pub fn route_read(
        &self,
        mapping: impl Into<MappingId>,
        key: impl AsRef<[u8]>,
    ) -> ShardResult<Arc<Shard>> {
        self.route(mapping.into(), key.as_ref())
    }

    /// Every shard of a mapping, in configured node order.
    pub fn broadcast(&self, mapping: impl Into<MappingId>) -> ShardResult<ShardCollection> {
        self.manager.load_shard_collection_of(mapping)
    }

    /// Group keys by owning node for batched point operations.
    ///
    /// Keys keep their relative input order within each group.
    pub fn route_many<K>(
        &self,
        mapping: impl Into<MappingId>,
        keys: impl IntoIterator<Item = K>,
    ) -> ShardResult<BTreeMap<NodeId, Vec<K>>>
    where
        K: AsRef<[u8]>,
    {
        let mapping = self.manager.load_shard_mapping(mapping)?;
        let mut groups: BTreeMap<NodeId, Vec<K>> = BTreeMap::new();
        for key in keys {
            let node_id = mapping.resolve(key.as_ref())?;
            groups.entry(node_id).or_default().push(key);
        }
        Ok(groups)
    }

    fn route(&self, mapping: MappingId, key: &[u8]) -> ShardResult<Arc<Shard>> {
        let shard = self.manager.load_shard_mapping(mapping.clone())?.resolve_shard(key)?;
        debug!("Routed key on mapping {} to node {}", mapping, shard.node_id());
        Ok(shard)
    }
}
