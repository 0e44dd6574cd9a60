//! FUSE adapter for zkfs
//!
//! Mounts a ZooKeeper tree (or a subtree of it) as a local directory.

use std::path::Path;

pub mod inode_table;
pub mod zk_fuse;

pub use inode_table::InodeTable;
pub use zk_fuse::ZkFuse;

/// Ask the platform to unmount `mount_point`
pub fn unmount(mount_point: &Path) -> Result<(), String> {
    #[cfg(target_os = "linux")]
    {
        let status = std::process::Command::new("fusermount")
            .args(["-u", &mount_point.to_string_lossy()])
            .status()
            .map_err(|e| e.to_string())?;

        if !status.success() {
            return Err(format!("fusermount -u failed with status: {}", status));
        }
    }

    #[cfg(target_os = "macos")]
    {
        let status = std::process::Command::new("umount")
            .arg(mount_point)
            .status()
            .map_err(|e| e.to_string())?;

        if !status.success() {
            return Err(format!("umount failed with status: {}", status));
        }
    }

    tracing::debug!(mount_point = %mount_point.display(), "unmount requested");
    Ok(())
}
