//! Distributed query fan-out.
//!
//! A query runs on every shard of a collection in four steps:
//!
//! 1. **Prepare**: one [`QueryTask`] per shard
//! 2. **Dispatch**: every task goes to a [`WorkerPool`]
//! 3. **Collect**: all handles are awaited concurrently under a deadline
//! 4. **Aggregate**: outcomes are keyed by node id, never merged

mod distributed;
mod worker;

pub use distributed::DistributedQueryMapper;
pub use worker::{TaskHandle, TokioWorkerPool, Worker, WorkerPool, DEFAULT_POOL_CAPACITY};

use crate::shard::Shard;
use serde::{Deserialize, Serialize};
use shardkit_core::query::QueryDescriptor;
use shardkit_core::types::{ConnectionRole, NodeId, SourceId};
use std::sync::Arc;
use std::time::Duration;

/// Default fan-out deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fan-out settings.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// How long to wait for every shard before giving up.
    pub timeout: Duration,
    /// Connection role each task uses.
    pub role: ConnectionRole,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            role: ConnectionRole::Read,
        }
    }
}

/// The unit of work for one shard.
#[derive(Debug, Clone)]
pub struct QueryTask {
    pub node_id: NodeId,
    pub query: Arc<QueryDescriptor>,
    pub shard: Arc<Shard>,
    pub role: ConnectionRole,
}

impl QueryTask {
    /// A read task for a shard.
    pub fn new(shard: Arc<Shard>, query: Arc<QueryDescriptor>) -> Self {
        Self {
            node_id: shard.node_id().clone(),
            query,
            shard,
            role: ConnectionRole::Read,
        }
    }

    pub fn with_role(mut self, role: ConnectionRole) -> Self {
        self.role = role;
        self
    }

    /// Serialisable form for job transports that resolve connections on
    /// the worker side.
    pub fn envelope(&self) -> TaskEnvelope {
        TaskEnvelope {
            node_id: self.node_id.clone(),
            source: self.shard.source(self.role).clone(),
            role: self.role,
            query: self.query.as_ref().clone(),
        }
    }
}

/// Wire form of a [`QueryTask`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub node_id: NodeId,
    pub source: SourceId,
    pub role: ConnectionRole,
    pub query: QueryDescriptor,
}
