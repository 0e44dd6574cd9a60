use std::path::PathBuf;

use clap::Args;

use crate::fuse;

/// Unmount a mount left behind by a process that did not shut down cleanly
#[derive(Args, Debug, Clone)]
pub struct Unmount {
    /// Directory the tree is mounted at
    pub mount_point: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum UnmountError {
    #[error("Unmount failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::op::Op for Unmount {
    type Error = UnmountError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        fuse::unmount(&self.mount_point).map_err(UnmountError::Failed)?;
        Ok(format!("Unmounted {}", self.mount_point.display()))
    }
}
