//! POSIX-to-store translation
//!
//! [`ZkFs`] routes each filesystem call to one of three managers:
//!
//! - [`attr`] turns node metadata into file attributes
//! - [`hierarchy`] creates, lists and deletes nodes
//! - [`content`] emulates byte-range reads, writes and truncation on top of
//!   whole-value get/set
//!
//! Every store failure is caught at the manager boundary and collapsed into
//! an [`FsError`]; nothing store-specific escapes this module.

pub mod attr;
pub mod content;
pub mod hierarchy;

use crate::store::{Store, StoreError};

pub use attr::{FileAttributes, NodeKind};
pub use content::WritePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("file exists")]
    AlreadyExists,
    #[error("operation not supported")]
    Unsupported,
    #[error("node changed concurrently and retries were exhausted")]
    Conflict,
}

impl FsError {
    /// Positive errno, as handed to the kernel
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::Unsupported => libc::ENOTSUP,
            FsError::Conflict => libc::EAGAIN,
        }
    }

    /// Negative result code
    pub fn code(&self) -> i32 {
        -self.errno()
    }
}

/// Collapse a store failure into `NotFound`.
///
/// Genuine absence and an unreachable store look the same to the caller;
/// the original error only survives in the log.
pub(crate) fn collapse(op: &'static str, path: &str, err: StoreError) -> FsError {
    match &err {
        StoreError::NoNode => {
            tracing::trace!(op, path, "node does not exist");
        }
        StoreError::Unavailable(_) => {
            tracing::warn!(op, path, error = %err, "store unavailable, reporting ENOENT");
        }
        _ => {
            tracing::debug!(op, path, error = %err, "store call failed, reporting ENOENT");
        }
    }
    FsError::NotFound
}

/// One filesystem call, as routed by [`ZkFs::dispatch`]
#[derive(Debug, Clone, Copy)]
pub enum FsCall<'a> {
    GetAttr { path: &'a str },
    MkDir { path: &'a str, mode: u32 },
    Create { path: &'a str, mode: u32 },
    ReadDir { path: &'a str },
    Rename { from: &'a str, to: &'a str },
    Read { path: &'a str, offset: u64, size: u32 },
    Write { path: &'a str, offset: u64, data: &'a [u8] },
    Truncate { path: &'a str, size: u64 },
    Unlink { path: &'a str },
    RmDir { path: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Attributes(FileAttributes),
    Bytes(Vec<u8>),
    Names(Vec<String>),
}

/// Result code plus optional payload.
///
/// `code` is zero (or the byte count for reads and writes) on success and a
/// negative errno on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOperationResult {
    pub code: i32,
    pub payload: Option<Payload>,
}

impl PathOperationResult {
    fn ok() -> Self {
        Self {
            code: 0,
            payload: None,
        }
    }

    fn with_payload(code: i32, payload: Payload) -> Self {
        Self {
            code,
            payload: Some(payload),
        }
    }

    fn err(err: FsError) -> Self {
        Self {
            code: err.code(),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code >= 0
    }
}

/// The path-level filesystem over a [`Store`].
///
/// Stateless between calls: no node data, metadata or classification is
/// kept here.
pub struct ZkFs<S> {
    store: S,
    root: String,
    write_policy: WritePolicy,
}

impl<S: Store> ZkFs<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            root: "/".to_string(),
            write_policy: WritePolicy::default(),
        }
    }

    /// Expose the subtree under `root` instead of the whole store
    pub fn with_root(mut self, root: &str) -> Self {
        let trimmed = root.trim_end_matches('/');
        self.root = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Map a mount-relative absolute path onto a store path
    pub fn store_path(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if self.root == "/" {
            path
        } else if path == "/" {
            self.root.clone()
        } else {
            format!("{}{}", self.root, path)
        }
    }

    pub async fn getattr(&self, path: &str) -> Result<FileAttributes, FsError> {
        attr::get_attributes(&self.store, &self.store_path(path)).await
    }

    /// `mode` is accepted for signature compatibility and ignored
    pub async fn mkdir(&self, path: &str, _mode: u32) -> Result<(), FsError> {
        hierarchy::create_node(&self.store, &self.store_path(path)).await
    }

    /// `mode` is accepted for signature compatibility and ignored
    pub async fn create(&self, path: &str, _mode: u32) -> Result<(), FsError> {
        hierarchy::create_node(&self.store, &self.store_path(path)).await
    }

    pub async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        hierarchy::list_children(&self.store, &self.store_path(path)).await
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        hierarchy::rename(&self.store_path(from), &self.store_path(to))
    }

    pub async fn read(&self, path: &str, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        content::read_range(&self.store, &self.store_path(path), offset, size).await
    }

    pub async fn write(&self, path: &str, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        content::write_range(
            &self.store,
            &self.store_path(path),
            offset,
            data,
            self.write_policy,
        )
        .await
    }

    pub async fn truncate(&self, path: &str, size: u64) -> Result<(), FsError> {
        content::truncate(&self.store, &self.store_path(path), size, self.write_policy).await
    }

    pub async fn unlink(&self, path: &str) -> Result<(), FsError> {
        hierarchy::delete_node(&self.store, &self.store_path(path)).await
    }

    pub async fn rmdir(&self, path: &str) -> Result<(), FsError> {
        hierarchy::delete_node(&self.store, &self.store_path(path)).await
    }

    /// Route a call and normalize its outcome into a result code
    pub async fn dispatch(&self, call: FsCall<'_>) -> PathOperationResult {
        tracing::trace!(?call, "dispatch");
        let result = match call {
            FsCall::GetAttr { path } => self
                .getattr(path)
                .await
                .map(|attr| PathOperationResult::with_payload(0, Payload::Attributes(attr))),
            FsCall::MkDir { path, mode } => {
                self.mkdir(path, mode).await.map(|_| PathOperationResult::ok())
            }
            FsCall::Create { path, mode } => {
                self.create(path, mode).await.map(|_| PathOperationResult::ok())
            }
            FsCall::ReadDir { path } => self
                .readdir(path)
                .await
                .map(|names| PathOperationResult::with_payload(0, Payload::Names(names))),
            FsCall::Rename { from, to } => {
                self.rename(from, to).await.map(|_| PathOperationResult::ok())
            }
            FsCall::Read { path, offset, size } => {
                self.read(path, offset, size).await.map(|bytes| {
                    PathOperationResult::with_payload(bytes.len() as i32, Payload::Bytes(bytes))
                })
            }
            FsCall::Write { path, offset, data } => self
                .write(path, offset, data)
                .await
                .map(|written| PathOperationResult {
                    code: written as i32,
                    payload: None,
                }),
            FsCall::Truncate { path, size } => {
                self.truncate(path, size).await.map(|_| PathOperationResult::ok())
            }
            FsCall::Unlink { path } => self.unlink(path).await.map(|_| PathOperationResult::ok()),
            FsCall::RmDir { path } => self.rmdir(path).await.map(|_| PathOperationResult::ok()),
        };

        result.unwrap_or_else(PathOperationResult::err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_error_codes() {
        assert_eq!(FsError::NotFound.code(), -libc::ENOENT);
        assert_eq!(FsError::AlreadyExists.code(), -libc::EEXIST);
        assert_eq!(FsError::Unsupported.errno(), libc::ENOTSUP);
        assert_eq!(FsError::Conflict.errno(), libc::EAGAIN);
    }

    #[test]
    fn test_store_path_default_root() {
        let fs = ZkFs::new(MemoryStore::new());
        assert_eq!(fs.store_path("/"), "/");
        assert_eq!(fs.store_path("/a/b"), "/a/b");
        assert_eq!(fs.store_path("a"), "/a");
    }

    #[test]
    fn test_store_path_with_root() {
        let fs = ZkFs::new(MemoryStore::new()).with_root("/apps/zkfs/");
        assert_eq!(fs.root(), "/apps/zkfs");
        assert_eq!(fs.store_path("/"), "/apps/zkfs");
        assert_eq!(fs.store_path("/a"), "/apps/zkfs/a");

        let fs = ZkFs::new(MemoryStore::new()).with_root("apps");
        assert_eq!(fs.store_path("/x"), "/apps/x");

        let fs = ZkFs::new(MemoryStore::new()).with_root("/");
        assert_eq!(fs.root(), "/");
    }

    #[tokio::test]
    async fn test_dispatch_codes() {
        let fs = ZkFs::new(MemoryStore::new());

        let created = fs.dispatch(FsCall::Create { path: "/f", mode: 0o644 }).await;
        assert_eq!(created, PathOperationResult::ok());

        let again = fs.dispatch(FsCall::MkDir { path: "/f", mode: 0o755 }).await;
        assert_eq!(again.code, -libc::EEXIST);

        let written = fs
            .dispatch(FsCall::Write {
                path: "/f",
                offset: 0,
                data: b"abc",
            })
            .await;
        assert_eq!(written.code, 3);

        let read = fs
            .dispatch(FsCall::Read {
                path: "/f",
                offset: 1,
                size: 10,
            })
            .await;
        assert_eq!(read.code, 2);
        assert_eq!(read.payload, Some(Payload::Bytes(b"bc".to_vec())));

        let renamed = fs.dispatch(FsCall::Rename { from: "/f", to: "/g" }).await;
        assert_eq!(renamed.code, -libc::ENOTSUP);

        let missing = fs.dispatch(FsCall::Unlink { path: "/nope" }).await;
        assert_eq!(missing.code, -libc::ENOENT);
        assert!(!missing.is_ok());
    }

    #[tokio::test]
    async fn test_subtree_root_is_isolated() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.create("/apps", b"").await.unwrap();
        let fs = ZkFs::new(store.clone()).with_root("/apps");

        fs.create("/x", 0).await.unwrap();
        assert!(store.exists("/apps/x").await.unwrap().is_some());
        assert_eq!(store.exists("/x").await.unwrap(), None);
        assert_eq!(fs.readdir("/").await.unwrap(), vec!["x"]);
    }
}
