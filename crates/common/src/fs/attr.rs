//! Node metadata to file attributes

use crate::store::{NodeStat, Store};

use super::{collapse, FsError};

/// Permission bits reported for directories
pub const DIR_PERM: u16 = 0o777;
/// Permission bits reported for regular files
pub const FILE_PERM: u16 = 0o666;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    Directory,
}

impl NodeKind {
    /// A node is a directory exactly when it has children
    pub fn classify(num_children: u32) -> Self {
        if num_children > 0 {
            NodeKind::Directory
        } else {
            NodeKind::Regular
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Attributes derived from a single node snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub kind: NodeKind,
    /// Length of the node's value in bytes
    pub size: u64,
    pub perm: u16,
    /// Creation time, seconds since the epoch
    pub ctime: i64,
    /// Modification time, seconds since the epoch
    pub mtime: i64,
}

impl FileAttributes {
    pub fn from_stat(stat: &NodeStat) -> Self {
        let kind = NodeKind::classify(stat.num_children);
        let perm = match kind {
            NodeKind::Directory => DIR_PERM,
            NodeKind::Regular => FILE_PERM,
        };

        Self {
            kind,
            size: stat.data_length as u64,
            perm,
            // sub-second precision is dropped
            ctime: stat.ctime_ms / 1000,
            mtime: stat.mtime_ms / 1000,
        }
    }
}

pub async fn get_attributes<S: Store + ?Sized>(
    store: &S,
    path: &str,
) -> Result<FileAttributes, FsError> {
    match store.exists(path).await {
        Ok(Some(stat)) => Ok(FileAttributes::from_stat(&stat)),
        Ok(None) => Err(FsError::NotFound),
        Err(e) => Err(collapse("getattr", path, e)),
    }
}
