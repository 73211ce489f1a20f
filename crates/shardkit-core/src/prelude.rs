//! Convenience re-exports of the commonly used core types.

pub use crate::config::{
    HashStrategy, MappingConfig, NodeConfig, ShardingConfig, DEFAULT_REPLICAS, MAX_REPLICAS,
    MAX_WEIGHT,
};
pub use crate::error::{ShardError, ShardResult};
pub use crate::query::{Predicate, PredicateOp, Projection, QueryDescriptor};
pub use crate::types::{
    ConnectionRole, FanOutResults, MappingId, NodeId, Row, SourceId, TaskOutcome,
};
