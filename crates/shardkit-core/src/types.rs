//! Identifiers and result types shared across the shard routing layer.
//!
//! Node, mapping and data source identifiers are plain strings in
//! configuration but distinct types in code, so a source id can never be
//! passed where a node id is expected.

use crate::error::ShardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identity of one physical node (shard) within a mapping.
    NodeId
);

string_id!(
    /// Name of a partitioning scheme, unique within a shard manager.
    MappingId
);

string_id!(
    /// Data source handed to the connection registry to obtain a connection.
    SourceId
);

/// Which of a shard's paired connections a task runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionRole {
    #[default]
    Read,
    Write,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Read => write!(f, "read"),
            ConnectionRole::Write => write!(f, "write"),
        }
    }
}

/// One result row, column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of a single node's task during a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The query ran and produced these rows.
    Rows(Vec<Row>),
    /// The node could not run the query.
    Failure(ShardError),
}

impl TaskOutcome {
    /// Rows of a successful outcome.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            TaskOutcome::Rows(rows) => Some(rows),
            TaskOutcome::Failure(_) => None,
        }
    }

    /// Error of a failed outcome.
    pub fn error(&self) -> Option<&ShardError> {
        match self {
            TaskOutcome::Rows(_) => None,
            TaskOutcome::Failure(err) => Some(err),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failure(_))
    }

    /// Convert into a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<Vec<Row>, ShardError> {
        match self {
            TaskOutcome::Rows(rows) => Ok(rows),
            TaskOutcome::Failure(err) => Err(err),
        }
    }
}

impl From<Result<Vec<Row>, ShardError>> for TaskOutcome {
    fn from(result: Result<Vec<Row>, ShardError>) -> Self {
        match result {
            Ok(rows) => TaskOutcome::Rows(rows),
            Err(err) => TaskOutcome::Failure(err),
        }
    }
}

/// Per-node outcomes of a fan-out, keyed by node id.
///
/// Rows from different nodes are never merged here; reducing them (summing
/// an aggregate across shards, for instance) is up to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutResults {
    outcomes: BTreeMap<NodeId, TaskOutcome>,
}

impl FanOutResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's outcome, replacing any earlier one.
    pub fn insert(&mut self, node_id: NodeId, outcome: TaskOutcome) {
        self.outcomes.insert(node_id, outcome);
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&TaskOutcome> {
        self.outcomes.get(node_id)
    }

    /// Rows returned by a node, if it succeeded.
    pub fn rows_of(&self, node_id: &NodeId) -> Option<&[Row]> {
        self.outcomes.get(node_id).and_then(TaskOutcome::rows)
    }

    /// Nodes whose task failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&NodeId, &ShardError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.error().map(|err| (id, err)))
    }

    /// Nodes whose task succeeded, with their rows.
    pub fn successes(&self) -> impl Iterator<Item = (&NodeId, &[Row])> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.rows().map(|rows| (id, rows)))
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.outcomes.contains_key(node_id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.outcomes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &TaskOutcome)> {
        self.outcomes.iter()
    }

    pub fn into_inner(self) -> BTreeMap<NodeId, TaskOutcome> {
        self.outcomes
    }
}

impl IntoIterator for FanOutResults {
    type Item = (NodeId, TaskOutcome);
    type IntoIter = std::collections::btree_map::IntoIter<NodeId, TaskOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
