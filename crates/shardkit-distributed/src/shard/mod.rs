//! Shards and shard collections.
//!
//! A [`Shard`] is a node identity plus the data sources of its read and
//! write connections. Connections are requested from the registry the first
//! time they are needed and cached for the shard's lifetime; the registry
//! stays the owner of the underlying handle.

mod collection;

pub use collection::ShardCollection;

use crate::connection::{Connection, ConnectionRegistry};
use shardkit_core::config::NodeConfig;
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::{ConnectionRole, NodeId, SourceId};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// One physical data partition and its connections.
pub struct Shard {
    node_id: NodeId,
    read_source: SourceId,
    write_source: SourceId,
    registry: Arc<dyn ConnectionRegistry>,
    read: OnceLock<Arc<dyn Connection>>,
    write: OnceLock<Arc<dyn Connection>>,
}

impl Shard {
    /// Create a shard with explicit read and write sources.
    pub fn new(
        node_id: NodeId,
        read_source: SourceId,
        write_source: SourceId,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self {
            node_id,
            read_source,
            write_source,
            registry,
            read: OnceLock::new(),
            write: OnceLock::new(),
        }
    }

    /// Create a shard whose read and write sources are both its node id.
    pub fn bare(node_id: NodeId, registry: Arc<dyn ConnectionRegistry>) -> Self {
        let source = SourceId::new(node_id.as_str());
        Self::new(node_id, source.clone(), source, registry)
    }

    /// Create a shard from a node's configuration.
    pub fn from_config(node: &NodeConfig, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self::new(
            node.id.clone(),
            node.read_source(),
            node.write_source(),
            registry,
        )
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn read_source(&self) -> &SourceId {
        &self.read_source
    }

    pub fn write_source(&self) -> &SourceId {
        &self.write_source
    }

    /// Source backing the connection of a role.
    pub fn source(&self, role: ConnectionRole) -> &SourceId {
        match role {
            ConnectionRole::Read => &self.read_source,
            ConnectionRole::Write => &self.write_source,
        }
    }

    /// The read connection, resolved on first use.
    pub fn read_connection(&self) -> ShardResult<Arc<dyn Connection>> {
        self.connection(ConnectionRole::Read)
    }

    /// The write connection, resolved on first use.
    pub fn write_connection(&self) -> ShardResult<Arc<dyn Connection>> {
        self.connection(ConnectionRole::Write)
    }

    /// The connection of a role, resolved on first use.
    ///
    /// Registry failures surface as [`ShardError::Connection`] tagged with
    /// this shard's node id. Failures are not cached.
    pub fn connection(&self, role: ConnectionRole) -> ShardResult<Arc<dyn Connection>> {
        let cell = match role {
            ConnectionRole::Read => &self.read,
            ConnectionRole::Write => &self.write,
        };
        if let Some(connection) = cell.get() {
            return Ok(Arc::clone(connection));
        }

        let source = self.source(role);
        let resolved = match role {
            ConnectionRole::Read => self.registry.read_connection(source),
            ConnectionRole::Write => self.registry.write_connection(source),
        }
        .map_err(|e| ShardError::connection(self.node_id.clone(), e.to_string()))?;
        debug!(
            "Resolved {} connection for node {} from source {}",
            role, self.node_id, source
        );

        // Another thread may have won the race; keep whichever landed first.
        Ok(Arc::clone(cell.get_or_init(|| resolved)))
    }

    /// Whether the connection of a role has been resolved already.
    pub fn is_connected(&self, role: ConnectionRole) -> bool {
        match role {
            ConnectionRole::Read => self.read.get().is_some(),
            ConnectionRole::Write => self.write.get().is_some(),
        }
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("node_id", &self.node_id)
            .field("read_source", &self.read_source)
            .field("write_source", &self.write_source)
            .field("read_connected", &self.read.get().is_some())
            .field("write_connected", &self.write.get().is_some())
            .finish()
    }
}
