use super::{MapperConfig, QueryTask, WorkerPool};
use crate::shard::ShardCollection;
use futures::stream::{FuturesUnordered, StreamExt};
use shardkit_core::error::{ShardError, ShardResult};
use shardkit_core::query::QueryDescriptor;
use shardkit_core::types::{FanOutResults, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Runs one query on every shard of a collection.
///
/// A failing node is recorded as a failure in the result and never aborts
/// its siblings. If the deadline passes first the call returns
/// [`ShardError::FanOutTimeout`] carrying whatever completed in time.
pub struct DistributedQueryMapper {
    pool: Arc<dyn WorkerPool>,
    config: MapperConfig,
}

impl DistributedQueryMapper {
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self::with_config(pool, MapperConfig::default())
    }

    pub fn with_config(pool: Arc<dyn WorkerPool>, config: MapperConfig) -> Self {
        Self { pool, config }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Fan `query` out to every shard and collect `{node_id: outcome}`.
    pub async fn map(
        &self,
        shards: &ShardCollection,
        query: &QueryDescriptor,
    ) -> ShardResult<FanOutResults> {
        let tasks = self.prepare(shards, query);
        let expected: Vec<NodeId> = tasks.iter().map(|t| t.node_id.clone()).collect();

        info!(
            "Dispatching query on {} to {} shard(s)",
            query.table,
            tasks.len()
        );
        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| self.pool.submit(task))
            .map(|handle| async move {
                let node_id = handle.node_id().clone();
                (node_id, handle.join().await)
            })
            .collect();

        let deadline = Instant::now() + self.config.timeout;
        let mut results = FanOutResults::new();
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((node_id, outcome))) => {
                    if let Some(err) = outcome.error() {
                        warn!("Shard {} failed: {}", node_id, err);
                    } else {
                        debug!("Shard {} answered", node_id);
                    }
                    results.insert(node_id, outcome);
                }
                Ok(None) => break,
                Err(_) => {
                    let missing: Vec<NodeId> = expected
                        .into_iter()
                        .filter(|id| !results.contains(id))
                        .collect();
                    warn!(
                        "Fan-out timed out after {:?}; waiting on {:?}",
                        self.config.timeout, missing
                    );
                    return Err(ShardError::FanOutTimeout {
                        timeout: self.config.timeout,
                        pending: missing,
                        partial: Box::new(results),
                    });
                }
            }
        }

        debug!(
            "Collected {} outcome(s), {} failed",
            results.len(),
            results.failures().count()
        );
        Ok(results)
    }

    fn prepare(&self, shards: &ShardCollection, query: &QueryDescriptor) -> Vec<QueryTask> {
        let query = Arc::new(query.clone());
        shards
            .iter()
            .map(|shard| {
                QueryTask::new(Arc::clone(shard), Arc::clone(&query)).with_role(self.config.role)
            })
            .collect()
    }
}

impl std::fmt::Debug for DistributedQueryMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedQueryMapper")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MemoryConnection, StaticRegistry};
    use crate::query::{TaskHandle, TokioWorkerPool};
    use crate::shard::Shard;
    use serde_json::json;
    use shardkit_core::types::{ConnectionRole, TaskOutcome};
    use std::sync::Mutex;

    /// Pool that drops every task without running it.
    struct BlackHolePool;

    impl WorkerPool for BlackHolePool {
        fn submit(&self, task: QueryTask) -> TaskHandle {
            let (_sender, handle) = TaskHandle::channel(task.node_id);
            handle
        }
    }

    /// Pool that records submitted roles and runs nothing.
    #[derive(Default)]
    struct RecordingPool {
        roles: Mutex<Vec<ConnectionRole>>,
    }

    impl WorkerPool for RecordingPool {
        fn submit(&self, task: QueryTask) -> TaskHandle {
            self.roles.lock().unwrap().push(task.role);
            let (sender, handle) = TaskHandle::channel(task.node_id);
            let _ = sender.send(Ok(Vec::new()));
            handle
        }
    }

    fn collection(registry: &Arc<StaticRegistry>, nodes: &[&str]) -> ShardCollection {
        nodes
            .iter()
            .map(|id| Arc::new(Shard::bare(NodeId::from(*id), registry.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let mapper = DistributedQueryMapper::new(Arc::new(TokioWorkerPool::default()));
        let results = mapper
            .map(&ShardCollection::new(), &QueryDescriptor::new("orders"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_rows_kept_per_node() {
        let registry = Arc::new(StaticRegistry::new());
        for (node, amount) in [("a", 1), ("b", 2)] {
            let conn = MemoryConnection::new();
            conn.insert("t", json!({ "amount": amount }));
            registry.register(node, Arc::new(conn));
        }

        let mapper = DistributedQueryMapper::new(Arc::new(TokioWorkerPool::default()));
        let results = mapper
            .map(&collection(&registry, &["a", "b"]), &QueryDescriptor::new("t"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results.rows_of(&NodeId::from("a")).unwrap()[0]["amount"], json!(1));
        assert_eq!(results.rows_of(&NodeId::from("b")).unwrap()[0]["amount"], json!(2));
    }

    #[tokio::test]
    async fn test_lost_workers_are_failures() {
        let registry = Arc::new(StaticRegistry::new());
        let mapper = DistributedQueryMapper::new(Arc::new(BlackHolePool));
        let results = mapper
            .map(&collection(&registry, &["a", "b"]), &QueryDescriptor::new("t"))
            .await
            .unwrap();

        assert_eq!(
            results.get(&NodeId::from("a")),
            Some(&TaskOutcome::Failure(ShardError::WorkerLost(NodeId::from("a"))))
        );
        assert_eq!(results.failures().count(), 2);
    }

    #[tokio::test]
    async fn test_role_is_applied_to_every_task() {
        let registry = Arc::new(StaticRegistry::new());
        let pool = Arc::new(RecordingPool::default());
        let config = MapperConfig {
            role: ConnectionRole::Write,
            ..MapperConfig::default()
        };
        let mapper = DistributedQueryMapper::with_config(pool.clone(), config);

        mapper
            .map(&collection(&registry, &["a", "b", "c"]), &QueryDescriptor::new("t"))
            .await
            .unwrap();
        assert_eq!(*pool.roles.lock().unwrap(), vec![ConnectionRole::Write; 3]);
    }
}
