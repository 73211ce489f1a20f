//! # Shardkit Distributed
//!
//! Shard routing and distributed query fan-out:
//!
//! - **Hashing** - consistent-hash ring and modulo strategies mapping keys to nodes
//! - **Mappings** - named partitioning schemes built from configuration
//! - **Dispatch** - single-key and broadcast routing to shards
//! - **Fan-out** - one query per shard through a worker pool, results keyed by node
//!
//! Connections are supplied by a [`ConnectionRegistry`]; any database
//! driver plugs in by implementing it together with [`Connection`].

pub mod connection;
pub mod dispatcher;
pub mod hashing;
pub mod manager;
pub mod mapping;
pub mod query;
pub mod shard;

pub use connection::{Connection, ConnectionError, ConnectionRegistry, MemoryConnection, StaticRegistry};
pub use dispatcher::ShardDispatcher;
pub use hashing::{build_hasher, ConsistentHashRing, KeyHasher, ModuloHasher};
pub use manager::ShardManager;
pub use mapping::ShardMapping;
pub use query::{
    DistributedQueryMapper, MapperConfig, QueryTask, TaskEnvelope, TaskHandle, TokioWorkerPool,
    Worker, WorkerPool,
};
pub use shard::{Shard, ShardCollection};
