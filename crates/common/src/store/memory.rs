//! In-process store with ZooKeeper node semantics
//!
//! Parents must exist before children are created, deleting a node with
//! children fails, every set bumps the node version, and values are capped
//! at [`MAX_PAYLOAD_BYTES`](super::MAX_PAYLOAD_BYTES).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{check_payload, NodeStat, Store, StoreError};

#[derive(Debug, Clone)]
struct MemNode {
    data: Vec<u8>,
    version: i32,
    ctime_ms: i64,
    mtime_ms: i64,
}

impl MemNode {
    fn new(data: Vec<u8>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            data,
            version: 0,
            ctime_ms: now,
            mtime_ms: now,
        }
    }
}

/// A znode tree held in memory
#[derive(Debug)]
pub struct MemoryStore {
    nodes: Mutex<BTreeMap<String, MemNode>>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create a store containing only the root node `/`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), MemNode::new(Vec::new()));
        Self {
            nodes: Mutex::new(nodes),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the session: while unavailable every
    /// call fails with [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection lost".to_string()))
        }
    }

    fn validate(path: &str) -> Result<(), StoreError> {
        if path == "/" {
            return Ok(());
        }
        if !path.starts_with('/') || path.ends_with('/') || path.contains("//") {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &path[..idx],
        }
    }

    fn child_prefix(path: &str) -> String {
        if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        }
    }

    fn children_of(nodes: &BTreeMap<String, MemNode>, path: &str) -> Vec<String> {
        let prefix = Self::child_prefix(path);
        nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect()
    }

    fn stat_of(nodes: &BTreeMap<String, MemNode>, path: &str, node: &MemNode) -> NodeStat {
        NodeStat {
            version: node.version,
            ctime_ms: node.ctime_ms,
            mtime_ms: node.mtime_ms,
            data_length: node.data.len() as u32,
            num_children: Self::children_of(nodes, path).len() as u32,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        let nodes = self.nodes.lock();
        Ok(nodes
            .get(path)
            .map(|node| Self::stat_of(&nodes, path, node)))
    }

    async fn create(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        check_payload(data)?;
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(path) {
            return Err(StoreError::NodeExists);
        }
        if !nodes.contains_key(Self::parent_of(path)) {
            return Err(StoreError::NoNode);
        }
        nodes.insert(path.to_string(), MemNode::new(data.to_vec()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        if path == "/" {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        if !Self::children_of(&nodes, path).is_empty() {
            return Err(StoreError::NotEmpty);
        }
        nodes.remove(path);
        Ok(())
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        let nodes = self.nodes.lock();
        let node = nodes.get(path).ok_or(StoreError::NoNode)?;
        Ok((node.data.clone(), Self::stat_of(&nodes, path, node)))
    }

    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<i32>,
    ) -> Result<NodeStat, StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        check_payload(data)?;
        let mut nodes = self.nodes.lock();
        let node = nodes.get_mut(path).ok_or(StoreError::NoNode)?;
        if let Some(expected) = expected_version {
            if node.version != expected {
                return Err(StoreError::BadVersion);
            }
        }
        node.data = data.to_vec();
        node.version += 1;
        node.mtime_ms = chrono::Utc::now().timestamp_millis().max(node.mtime_ms);
        let node = node.clone();
        Ok(Self::stat_of(&nodes, path, &node))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        Self::validate(path)?;
        let nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        Ok(Self::children_of(&nodes, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MAX_PAYLOAD_BYTES;

    #[tokio::test]
    async fn test_create_requires_parent() {
        let store = MemoryStore::new();
        assert_eq!(store.create("/a/b", b"").await, Err(StoreError::NoNode));

        store.create("/a", b"").await.unwrap();
        store.create("/a/b", b"x").await.unwrap();
        assert_eq!(store.create("/a/b", b"").await, Err(StoreError::NodeExists));
    }

    #[tokio::test]
    async fn test_children_are_immediate_only() {
        let store = MemoryStore::new();
        store.create("/a", b"").await.unwrap();
        store.create("/a/b", b"").await.unwrap();
        store.create("/a/b/c", b"").await.unwrap();
        store.create("/ab", b"").await.unwrap();

        let mut root = store.get_children("/").await.unwrap();
        root.sort();
        assert_eq!(root, vec!["a".to_string(), "ab".to_string()]);
        assert_eq!(store.get_children("/a").await.unwrap(), vec!["b"]);

        let stat = store.exists("/a").await.unwrap().unwrap();
        assert_eq!(stat.num_children, 1);
    }

    #[tokio::test]
    async fn test_delete_non_empty_fails() {
        let store = MemoryStore::new();
        store.create("/a", b"").await.unwrap();
        store.create("/a/b", b"").await.unwrap();

        assert_eq!(store.delete("/a").await, Err(StoreError::NotEmpty));
        store.delete("/a/b").await.unwrap();
        store.delete("/a").await.unwrap();
        assert_eq!(store.exists("/a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_data_bumps_version_and_checks_expected() {
        let store = MemoryStore::new();
        store.create("/v", b"one").await.unwrap();

        let stat = store.set_data("/v", b"two", None).await.unwrap();
        assert_eq!(stat.version, 1);
        assert_eq!(stat.data_length, 3);

        assert_eq!(
            store.set_data("/v", b"three", Some(0)).await,
            Err(StoreError::BadVersion)
        );
        let stat = store.set_data("/v", b"three", Some(1)).await.unwrap();
        assert_eq!(stat.version, 2);

        let (data, _) = store.get_data("/v").await.unwrap();
        assert_eq!(data, b"three");
    }

    #[tokio::test]
    async fn test_payload_ceiling() {
        let store = MemoryStore::new();
        store.create("/big", b"").await.unwrap();

        let too_big = vec![0u8; MAX_PAYLOAD_BYTES + 1];
        assert!(matches!(
            store.set_data("/big", &too_big, None).await,
            Err(StoreError::PayloadTooLarge { .. })
        ));

        let fits = vec![0u8; MAX_PAYLOAD_BYTES];
        store.set_data("/big", &fits, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_paths_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create("relative", b"").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.create("/trailing/", b"").await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.exists("/").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.exists("/").await.unwrap().is_some());
    }
}
