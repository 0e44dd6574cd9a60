//! Mount a ZooKeeper tree at a local directory
//!
//! Runs in the foreground until the filesystem is unmounted or the process
//! receives SIGINT/SIGTERM.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use fuser::MountOption;
use tokio::signal::unix::{signal, SignalKind};

use common::fs::ZkFs;
use common::store::{Store, StoreError};

use crate::config::{AppConfig, Backend, ConfigError, WriteMode};
use crate::fuse::{self, ZkFuse};
use crate::logging;
use crate::op::Op;
use crate::session::StoreSession;

#[derive(Args, Debug, Clone)]
pub struct Mount {
    /// ZooKeeper connect string, e.g. zk1:2181,zk2:2181
    pub connect: String,

    /// Local directory to mount the tree at
    pub mount_point: PathBuf,

    /// Store path to expose as the mount root
    #[arg(long)]
    pub root: Option<String>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    #[arg(long, value_enum)]
    pub write_policy: Option<WriteMode>,

    /// Retries per write under compare-and-set
    #[arg(long)]
    pub max_cas_retries: Option<u32>,

    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Attribute cache lifetime handed to the kernel
    #[arg(long)]
    pub attr_ttl_ms: Option<u64>,

    /// Allow other users to access the mount (requires user_allow_other in /etc/fuse.conf)
    #[arg(long)]
    pub allow_other: bool,

    #[arg(long)]
    pub log_level: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("Mount point is not a directory: {0}")]
    MountPointNotDirectory(PathBuf),
    #[error("root node does not exist: {0}")]
    RootNotFound(String),
    #[error("FUSE error: {0}")]
    Fuse(String),
}

impl Mount {
    /// Command-line flags take precedence over the config file
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(write_policy) = self.write_policy {
            config.write_policy = write_policy;
        }
        if let Some(retries) = self.max_cas_retries {
            config.max_cas_retries = retries;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout_ms = timeout;
        }
        if let Some(ttl) = self.attr_ttl_ms {
            config.attr_ttl_ms = ttl;
        }
        if self.allow_other {
            config.allow_other = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
    }

    fn prepare_mount_point(&self) -> Result<(), MountError> {
        // Create mount point if it doesn't exist
        if !self.mount_point.exists() {
            std::fs::create_dir_all(&self.mount_point)?;
        }

        if !self.mount_point.is_dir() {
            return Err(MountError::MountPointNotDirectory(self.mount_point.clone()));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Op for Mount {
    type Error = MountError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::load(ctx.config_path.clone())?;
        self.apply_overrides(&mut config);

        let _guards = logging::init_logging(&config)?;

        self.prepare_mount_point()?;

        let session = StoreSession::open(&config, &self.connect).await?;
        let zk_fs = ZkFs::new(session.store())
            .with_root(&config.root)
            .with_write_policy(config.write_policy());

        // Nodes are never created implicitly, including the mount root
        if zk_fs.store().exists(zk_fs.root()).await?.is_none() {
            return Err(MountError::RootNotFound(zk_fs.root().to_string()));
        }

        let fs = ZkFuse::new(
            tokio::runtime::Handle::current(),
            zk_fs,
            Duration::from_millis(config.attr_ttl_ms),
        );

        let mut options = vec![
            MountOption::FSName("zkfs".to_string()),
            MountOption::Subtype("zkfs".to_string()),
            MountOption::AutoUnmount,
            MountOption::DefaultPermissions,
        ];

        if config.allow_other {
            options.push(MountOption::AllowOther);
        }

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tracing::info!(
            connect = %self.connect,
            root = %config.root,
            mount_point = %self.mount_point.display(),
            "mounting"
        );
        println!("Press Ctrl+C to unmount");

        // Run the FUSE mount in a blocking thread
        let mount_point = self.mount_point.clone();
        let mut mount_task =
            tokio::task::spawn_blocking(move || fuser::mount2(fs, &mount_point, &options));

        let result = tokio::select! {
            result = &mut mount_task => result,
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, unmounting");
                fuse::unmount(&self.mount_point).map_err(MountError::Fuse)?;
                mount_task.await
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, unmounting");
                fuse::unmount(&self.mount_point).map_err(MountError::Fuse)?;
                mount_task.await
            }
        };

        session.close();

        result.map_err(|e| MountError::Fuse(e.to_string()))??;

        tracing::info!(mount_point = %self.mount_point.display(), "unmounted");
        Ok(format!("Unmounted {}", self.mount_point.display()))
    }
}
