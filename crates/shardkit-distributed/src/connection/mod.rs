//! Connection registry seam.
//!
//! Shards do not open connections themselves. They ask a
//! [`ConnectionRegistry`] for the read or write [`Connection`] of a data
//! source, and the registry owns pooling and lifecycle. Any database driver
//! plugs in by implementing these two traits.
//!
//! Two implementations ship with the crate:
//!
//! - [`StaticRegistry`] maps source ids to pre-built connections.
//! - [`MemoryConnection`] keeps tables in memory and understands enough of a
//!   [`QueryDescriptor`] for tests and local development.

mod memory;

pub use memory::MemoryConnection;

use async_trait::async_trait;
use shardkit_core::query::QueryDescriptor;
use shardkit_core::types::{Row, SourceId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// Errors raised by registries and connections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("no connection registered for source '{0}'")]
    UnknownSource(SourceId),

    #[error("unsupported query: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String),
}

/// A live handle able to execute a query descriptor.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute the query and return its rows.
    async fn execute(&self, query: &QueryDescriptor) -> Result<Vec<Row>, ConnectionError>;
}

/// Supplies connections per data source.
///
/// Implementations must be idempotent per source id; returning a cached
/// handle on repeated calls is expected.
pub trait ConnectionRegistry: Send + Sync {
    fn write_connection(&self, source: &SourceId) -> Result<Arc<dyn Connection>, ConnectionError>;

    fn read_connection(&self, source: &SourceId) -> Result<Arc<dyn Connection>, ConnectionError>;
}

/// Registry backed by a fixed table of connections.
///
/// Write connections fall back to the read connection of the same source
/// (and vice versa) when only one side was registered.
#[derive(Default)]
pub struct StaticRegistry {
    read: RwLock<HashMap<SourceId, Arc<dyn Connection>>>,
    write: RwLock<HashMap<SourceId, Arc<dyn Connection>>>,
}

impl StaticRegistry {
    /// Create an empty registry. Every lookup fails until sources are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one connection serving both reads and writes of a source.
    pub fn register(&self, source: impl Into<SourceId>, connection: Arc<dyn Connection>) {
        let source = source.into();
        debug!("Registered connection for source {}", source);
        write_lock(&self.read).insert(source.clone(), Arc::clone(&connection));
        write_lock(&self.write).insert(source, connection);
    }

    pub fn register_read(&self, source: impl Into<SourceId>, connection: Arc<dyn Connection>) {
        write_lock(&self.read).insert(source.into(), connection);
    }

    pub fn register_write(&self, source: impl Into<SourceId>, connection: Arc<dyn Connection>) {
        write_lock(&self.write).insert(source.into(), connection);
    }

    /// Remove every connection of a source.
    pub fn unregister(&self, source: &SourceId) {
        write_lock(&self.read).remove(source);
        write_lock(&self.write).remove(source);
        debug!("Unregistered connection for source {}", source);
    }

    fn lookup(
        primary: &RwLock<HashMap<SourceId, Arc<dyn Connection>>>,
        fallback: &RwLock<HashMap<SourceId, Arc<dyn Connection>>>,
        source: &SourceId,
    ) -> Result<Arc<dyn Connection>, ConnectionError> {
        if let Some(connection) = read_lock(primary).get(source) {
            return Ok(Arc::clone(connection));
        }
        read_lock(fallback)
            .get(source)
            .cloned()
            .ok_or_else(|| ConnectionError::UnknownSource(source.clone()))
    }
}

impl ConnectionRegistry for StaticRegistry {
    fn write_connection(&self, source: &SourceId) -> Result<Arc<dyn Connection>, ConnectionError> {
        Self::lookup(&self.write, &self.read, source)
    }

    fn read_connection(&self, source: &SourceId) -> Result<Arc<dyn Connection>, ConnectionError> {
        Self::lookup(&self.read, &self.write, source)
    }
}

impl std::fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut read: Vec<SourceId> = read_lock(&self.read).keys().cloned().collect();
        let mut write: Vec<SourceId> = read_lock(&self.write).keys().cloned().collect();
        read.sort();
        write.sort();
        f.debug_struct("StaticRegistry")
            .field("read", &read)
            .field("write", &write)
            .finish()
    }
}

// A poisoned lock only means another thread panicked mid-insert; the map
// itself is still usable.
fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
