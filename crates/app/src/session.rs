//! Store session held for the lifetime of a mount

use std::sync::Arc;
use std::time::Duration;

use common::store::{MemoryStore, Store, StoreError, ZkStore};

use crate::config::{AppConfig, Backend};

/// The store a mount talks to, kept concrete so it can be closed explicitly
#[derive(Debug)]
pub enum StoreSession {
    Zookeeper(Arc<ZkStore>),
    Memory(Arc<MemoryStore>),
}

impl StoreSession {
    /// Open a session against the configured backend
    pub async fn open(config: &AppConfig, connect: &str) -> Result<Self, StoreError> {
        match config.backend {
            Backend::Zookeeper => {
                let timeout = Duration::from_millis(config.connect_timeout_ms);
                let store = ZkStore::connect(connect, timeout).await?;
                Ok(StoreSession::Zookeeper(Arc::new(store)))
            }
            Backend::Memory => {
                tracing::warn!("using in-memory store; contents are lost on unmount");
                Ok(StoreSession::Memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        match self {
            StoreSession::Zookeeper(store) => store.clone(),
            StoreSession::Memory(store) => store.clone(),
        }
    }

    /// Close the session. Any handle still held elsewhere keeps the
    /// connection alive until it is dropped.
    pub fn close(self) {
        match self {
            StoreSession::Zookeeper(store) => match Arc::try_unwrap(store) {
                Ok(store) => store.close(),
                Err(_) => tracing::warn!("store still in use, deferring session close"),
            },
            StoreSession::Memory(_) => {}
        }
    }
}
