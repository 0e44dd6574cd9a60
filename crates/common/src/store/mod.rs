//! The coordination-store seam.
//!
//! Everything above this module talks to the store exclusively through the
//! [`Store`] trait: six primitives mirroring what a ZooKeeper session offers
//! (existence check, create, delete, get-data, set-data, list-children).
//! Two implementations live here: [`ZkStore`] for a real ensemble and
//! [`MemoryStore`] for tests and local experiments.

pub mod memory;
pub mod zookeeper;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use zookeeper::ZkStore;

/// Largest value a single node may hold (ZooKeeper's default `jute.maxbuffer`).
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Metadata snapshot of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    /// Data version, bumped on every successful set
    pub version: i32,
    /// Creation time in milliseconds since the epoch
    pub ctime_ms: i64,
    /// Last modification time in milliseconds since the epoch
    pub mtime_ms: i64,
    /// Length of the node's value in bytes
    pub data_length: u32,
    /// Number of immediate children
    pub num_children: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("node does not exist")]
    NoNode,
    #[error("node already exists")]
    NodeExists,
    #[error("node has children")]
    NotEmpty,
    #[error("node version does not match the expected version")]
    BadVersion,
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store error: {0}")]
    Other(String),
}

/// Client-side view of a hierarchical coordination store.
///
/// Every call is a single round trip; nothing is retried here.
#[async_trait]
pub trait Store: Send + Sync {
    /// Stat the node at `path`, `None` if it does not exist
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, StoreError>;

    /// Create a persistent node holding `data`. The parent must exist.
    async fn create(&self, path: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Delete the node at `path` regardless of its version
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Fetch the whole value of a node together with its metadata
    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), StoreError>;

    /// Replace the whole value of a node.
    ///
    /// With `expected_version` set, the write only succeeds if the node is
    /// still at that version, otherwise it fails with [`StoreError::BadVersion`].
    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<i32>,
    ) -> Result<NodeStat, StoreError>;

    /// Names of the immediate children of a node
    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, StoreError> {
        (**self).exists(path).await
    }

    async fn create(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).create(path, data).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete(path).await
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), StoreError> {
        (**self).get_data(path).await
    }

    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<i32>,
    ) -> Result<NodeStat, StoreError> {
        (**self).set_data(path, data, expected_version).await
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        (**self).get_children(path).await
    }
}

/// Reject values the store would refuse anyway
pub(crate) fn check_payload(data: &[u8]) -> Result<(), StoreError> {
    if data.len() > MAX_PAYLOAD_BYTES {
        return Err(StoreError::PayloadTooLarge {
            size: data.len(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    Ok(())
}
