//! Error types for shard routing and fan-out.
//!
//! Configuration and empty-ring errors are fatal to the call that raised
//! them. Connection errors stay local to one node during a fan-out and are
//! recorded in that node's [`TaskOutcome`](crate::types::TaskOutcome).

use crate::types::{FanOutResults, MappingId, NodeId};
use std::time::Duration;
use thiserror::Error;

/// Result type for shard operations.
pub type ShardResult<T> = Result<T, ShardError>;

/// Errors that can occur while routing or fanning out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShardError {
    #[error("mapping '{0}' is undefined")]
    UnknownMapping(MappingId),

    #[error("node '{node}' is not part of mapping '{mapping}'")]
    UnknownNode { mapping: MappingId, node: NodeId },

    #[error("invalid sharding config: {0}")]
    InvalidConfig(String),

    #[error("no nodes registered on the hasher")]
    EmptyRing,

    #[error("connection error on node '{node}': {message}")]
    Connection { node: NodeId, message: String },

    #[error("worker for node '{0}' dropped its task")]
    WorkerLost(NodeId),

    #[error(
        "fan-out timed out after {timeout:?} with {} node(s) pending",
        .pending.len()
    )]
    FanOutTimeout {
        timeout: Duration,
        /// Nodes that had not answered when the deadline fired.
        pending: Vec<NodeId>,
        /// Outcomes of the nodes that did answer in time.
        partial: Box<FanOutResults>,
    },
}

impl ShardError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        ShardError::InvalidConfig(reason.into())
    }

    pub fn unknown_node(mapping: impl Into<MappingId>, node: impl Into<NodeId>) -> Self {
        ShardError::UnknownNode {
            mapping: mapping.into(),
            node: node.into(),
        }
    }

    pub fn connection(node: impl Into<NodeId>, message: impl Into<String>) -> Self {
        ShardError::Connection {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Unknown mapping, unknown node, or malformed configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ShardError::UnknownMapping(_)
                | ShardError::UnknownNode { .. }
                | ShardError::InvalidConfig(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ShardError::FanOutTimeout { .. })
    }

    /// Completed outcomes carried by a timeout.
    pub fn partial_results(&self) -> Option<&FanOutResults> {
        match self {
            ShardError::FanOutTimeout { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
