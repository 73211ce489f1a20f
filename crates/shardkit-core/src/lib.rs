//! # Shardkit Core
//!
//! Shared types for shard routing and distributed query fan-out:
//!
//! - **Identifiers** - [`NodeId`](types::NodeId), [`MappingId`](types::MappingId) and [`SourceId`](types::SourceId) newtypes
//! - **Configuration** - [`ShardingConfig`](config::ShardingConfig), [`MappingConfig`](config::MappingConfig) and
//!   [`NodeConfig`](config::NodeConfig),
//!   validated once when a shard manager is built
//! - **Queries** - the structured [`QueryDescriptor`](query::QueryDescriptor) shipped to every shard,
//!   and the [`Row`](types::Row)s that come back
//! - **Errors** - [`ShardError`](error::ShardError) and the [`ShardResult`](error::ShardResult) alias
//!
//! ```rust
//! use shardkit_core::prelude::*;
//!
//! let mapping = MappingConfig::new("M_store_id", HashStrategy::Ring)
//!     .with_node(NodeConfig::new("node1"))
//!     .with_node(NodeConfig::new("node2").with_weight(2));
//!
//! let config = ShardingConfig::default().with_mapping(mapping);
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod prelude;
pub mod query;
pub mod types;
