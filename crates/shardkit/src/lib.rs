//! # Shardkit
//!
//! Shard routing and distributed query fan-out for horizontally
//! partitioned relational data.
//!
//! Keys are assigned to nodes by a consistent-hash ring (or a static modulo
//! hash), single-key operations are routed to one shard, and broadcast
//! queries fan out to every shard of a mapping through a worker pool with
//! results kept per node.
//!
//! ## Quick Start
//!
//! ```rust
//! use shardkit::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(StaticRegistry::new());
//!     for (node, amount) in [("node1", 200), ("node2", 1000)] {
//!         let conn = MemoryConnection::new();
//!         conn.insert("orders", json!({"store_id": 1, "amount": amount}));
//!         registry.register(node, Arc::new(conn));
//!     }
//!
//!     let config = ShardingConfig::default().with_mapping(
//!         MappingConfig::new("M_store_id", HashStrategy::Ring)
//!             .with_node(NodeConfig::new("node1"))
//!             .with_node(NodeConfig::new("node2")),
//!     );
//!     let manager = ShardManager::new(config, registry).unwrap();
//!
//!     // Point operation
//!     let shard = manager.dispatcher().route_write("M_store_id", "1").unwrap();
//!     println!("store 1 lives on {}", shard.node_id());
//!
//!     // Broadcast query
//!     let shards = manager.dispatcher().broadcast("M_store_id").unwrap();
//!     let mapper = DistributedQueryMapper::new(Arc::new(TokioWorkerPool::default()));
//!     let query = QueryDescriptor::new("orders").select_as("SUM(amount)", "amount");
//!     let results = mapper.map(&shards, &query).await.unwrap();
//!
//!     assert_eq!(results.rows_of(&NodeId::from("node1")).unwrap()[0]["amount"], json!(200));
//!     assert_eq!(results.rows_of(&NodeId::from("node2")).unwrap()[0]["amount"], json!(1000));
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`shardkit_core`] - Identifiers, configuration, query descriptors and errors
//! - `shardkit_distributed` - Hashing, mappings, dispatch, connections and fan-out
//!   (requires the `distributed` feature, on by default)

// Re-export all subcrates
pub use shardkit_core as core;

#[cfg(feature = "distributed")]
pub use shardkit_distributed as distributed;

/// Prelude module for convenient imports.
///
/// ```rust
/// use shardkit::prelude::*;
/// ```
pub mod prelude {
    pub use shardkit_core::prelude::*;

    #[cfg(feature = "distributed")]
    pub use shardkit_distributed::{
        Connection, ConnectionError, ConnectionRegistry, MemoryConnection, StaticRegistry,
        ConsistentHashRing, KeyHasher, ModuloHasher,
        DistributedQueryMapper, MapperConfig, TokioWorkerPool, WorkerPool,
        Shard, ShardCollection, ShardDispatcher, ShardManager, ShardMapping,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
