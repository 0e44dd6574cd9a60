//! ZooKeeper-backed [`Store`]
//!
//! One `ZkStore` owns one ZooKeeper session for the lifetime of a mount.
//! Session re-establishment and request pipelining are handled by the
//! `zookeeper-client` crate; this adapter only translates calls and errors.

use std::time::Duration;

use async_trait::async_trait;
use zookeeper_client as zk;

use super::{check_payload, NodeStat, Store, StoreError};

pub struct ZkStore {
    client: zk::Client,
    cluster: String,
}

impl ZkStore {
    /// Open a session against `cluster` (a ZooKeeper connect string such as
    /// `zk1:2181,zk2:2181`), giving up after `timeout`
    pub async fn connect(cluster: &str, timeout: Duration) -> Result<Self, StoreError> {
        tracing::info!(cluster, ?timeout, "connecting to zookeeper");

        let client = match tokio::time::timeout(timeout, zk::Client::connect(cluster)).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(StoreError::Unavailable(e.to_string())),
            Err(_) => {
                return Err(StoreError::Unavailable(format!(
                    "timed out after {:?} connecting to {}",
                    timeout, cluster
                )))
            }
        };

        tracing::info!(cluster, "zookeeper session established");
        Ok(Self {
            client,
            cluster: cluster.to_string(),
        })
    }

    /// Close the session. Dropping the last client handle ends it.
    pub fn close(self) {
        tracing::info!(cluster = %self.cluster, "closing zookeeper session");
        drop(self.client);
    }
}

impl std::fmt::Debug for ZkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZkStore")
            .field("cluster", &self.cluster)
            .finish()
    }
}

fn map_error(e: zk::Error) -> StoreError {
    match e {
        zk::Error::NoNode => StoreError::NoNode,
        zk::Error::NodeExists => StoreError::NodeExists,
        zk::Error::NotEmpty => StoreError::NotEmpty,
        zk::Error::BadVersion => StoreError::BadVersion,
        zk::Error::ConnectionLoss | zk::Error::SessionExpired => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Other(other.to_string()),
    }
}

fn map_stat(stat: &zk::Stat) -> NodeStat {
    NodeStat {
        version: stat.version,
        ctime_ms: stat.ctime,
        mtime_ms: stat.mtime,
        data_length: stat.data_length.max(0) as u32,
        num_children: stat.num_children.max(0) as u32,
    }
}

#[async_trait]
impl Store for ZkStore {
    async fn exists(&self, path: &str) -> Result<Option<NodeStat>, StoreError> {
        let stat = self.client.check_stat(path).await.map_err(map_error)?;
        Ok(stat.as_ref().map(map_stat))
    }

    async fn create(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        check_payload(data)?;
        let options = zk::CreateMode::Persistent.with_acls(zk::Acls::anyone_all());
        self.client
            .create(path, data, &options)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.client.delete(path, None).await.map_err(map_error)
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, NodeStat), StoreError> {
        let (data, stat) = self.client.get_data(path).await.map_err(map_error)?;
        Ok((data, map_stat(&stat)))
    }

    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<i32>,
    ) -> Result<NodeStat, StoreError> {
        check_payload(data)?;
        let stat = self
            .client
            .set_data(path, data, expected_version)
            .await
            .map_err(map_error)?;
        Ok(map_stat(&stat))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.client.list_children(path).await.map_err(map_error)
    }
}
