//! Workers and worker pools.

use super::QueryTask;
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::types::{NodeId, Row, TaskOutcome};
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};
use tracing::debug;

/// Default number of tasks a [`TokioWorkerPool`] runs at once.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Executes one task against its shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct Worker;

impl Worker {
    pub fn new() -> Self {
        Self
    }

    /// Acquire the task's connection and run its query.
    pub async fn execute(&self, task: &QueryTask) -> ShardResult<Vec<Row>> {
        let connection = task.shard.connection(task.role)?;
        debug!("Executing query on {} ({})", task.node_id, task.role);
        connection
            .execute(&task.query)
            .await
            .map_err(|e| ShardError::connection(task.node_id.clone(), e.to_string()))
    }
}

/// Pending result of a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    node_id: NodeId,
    receiver: oneshot::Receiver<ShardResult<Vec<Row>>>,
}

impl TaskHandle {
    /// A handle and the sender that completes it.
    pub fn channel(node_id: NodeId) -> (oneshot::Sender<ShardResult<Vec<Row>>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { node_id, receiver })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Wait for the outcome. A dropped sender yields
    /// [`ShardError::WorkerLost`].
    pub async fn join(self) -> TaskOutcome {
        match self.receiver.await {
            Ok(result) => result.into(),
            Err(_) => TaskOutcome::Failure(ShardError::WorkerLost(self.node_id)),
        }
    }
}

/// Accepts tasks and runs them somewhere.
pub trait WorkerPool: Send + Sync {
    /// Queue a task. Must not block.
    fn submit(&self, task: QueryTask) -> TaskHandle;
}

/// Pool running tasks on the tokio runtime, at most `capacity` at once.
///
/// `submit` must be called from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioWorkerPool {
    worker: Worker,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl TokioWorkerPool {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Pool capacity must be greater than 0");

        Self {
            worker: Worker::new(),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TokioWorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl WorkerPool for TokioWorkerPool {
    fn submit(&self, task: QueryTask) -> TaskHandle {
        let (sender, handle) = TaskHandle::channel(task.node_id.clone());
        let permits = Arc::clone(&self.permits);
        let worker = self.worker;

        tokio::spawn(async move {
            // The semaphore is never closed.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = worker.execute(&task).await;
            // The mapper may have stopped waiting; late results are dropped.
            let _ = sender.send(result);
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MemoryConnection, StaticRegistry};
    use crate::shard::Shard;
    use serde_json::json;
    use shardkit_core::query::QueryDescriptor;
    use shardkit_core::types::ConnectionRole;

    fn task_for(registry: Arc<StaticRegistry>, node: &str) -> QueryTask {
        let shard = Arc::new(Shard::bare(NodeId::from(node), registry));
        QueryTask::new(shard, Arc::new(QueryDescriptor::new("orders")))
    }

    #[tokio::test]
    async fn test_worker_executes_on_shard_connection() {
        let registry = Arc::new(StaticRegistry::new());
        let conn = MemoryConnection::new();
        conn.insert("orders", json!({"amount": 5}));
        registry.register("node1", Arc::new(conn));

        let rows = Worker::new().execute(&task_for(registry, "node1")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_reports_missing_connection() {
        let task = task_for(Arc::new(StaticRegistry::new()), "node1").with_role(ConnectionRole::Write);
        let err = Worker::new().execute(&task).await.unwrap_err();
        assert!(matches!(err, ShardError::Connection { ref node, .. } if node.as_str() == "node1"));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_worker_lost() {
        let (sender, handle) = TaskHandle::channel(NodeId::from("node3"));
        drop(sender);
        assert_eq!(
            handle.join().await,
            TaskOutcome::Failure(ShardError::WorkerLost(NodeId::from("node3")))
        );
    }

    #[tokio::test]
    async fn test_pool_runs_submitted_tasks() {
        let registry = Arc::new(StaticRegistry::new());
        registry.register("node1", Arc::new(MemoryConnection::new()));
        let pool = TokioWorkerPool::new(1);

        let first = pool.submit(task_for(Arc::clone(&registry), "node1"));
        let second = pool.submit(task_for(registry, "node2"));
        assert_eq!(first.node_id(), &NodeId::from("node1"));

        assert_eq!(first.join().await, TaskOutcome::Rows(Vec::new()));
        assert!(second.join().await.is_failure());
    }

    #[test]
    #[should_panic(expected = "Pool capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        let _ = TokioWorkerPool::new(0);
    }
}
