//! Shared test utilities for filesystem integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::fs::ZkFs;
use common::store::MemoryStore;

/// Set up a filesystem over a fresh in-memory store.
/// The store handle is returned too so tests can inspect or sabotage it.
pub fn setup_test_env() -> (ZkFs<Arc<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let fs = ZkFs::new(store.clone());
    (fs, store)
}

/// Create `path` and fill it with `data`
pub async fn seed_file(fs: &ZkFs<Arc<MemoryStore>>, path: &str, data: &[u8]) {
    fs.create(path, 0o644).await.unwrap();
    if !data.is_empty() {
        fs.write(path, 0, data).await.unwrap();
    }
}
