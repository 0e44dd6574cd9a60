//! Create, list and delete nodes.
//!
//! The store has a single node kind, so "create file" and "make directory"
//! are the same operation: a directory is simply a node that later gains
//! children. Likewise unlink and rmdir both map to a plain delete.

use crate::store::Store;

use super::{collapse, FsError};

/// Create an empty node at `path`.
///
/// Fails `AlreadyExists` if the node is already there. Any failure of the
/// create itself, including losing a race against another creator between
/// the check and the create, is reported as `NotFound`.
pub async fn create_node<S: Store + ?Sized>(store: &S, path: &str) -> Result<(), FsError> {
    match store.exists(path).await {
        Ok(Some(_)) => return Err(FsError::AlreadyExists),
        Ok(None) => {}
        Err(e) => return Err(collapse("create", path, e)),
    }

    store
        .create(path, &[])
        .await
        .map_err(|e| collapse("create", path, e))?;

    tracing::debug!(path, "created node");
    Ok(())
}

/// Immediate child names, in whatever order the store enumerates them
pub async fn list_children<S: Store + ?Sized>(
    store: &S,
    path: &str,
) -> Result<Vec<String>, FsError> {
    store
        .get_children(path)
        .await
        .map_err(|e| collapse("readdir", path, e))
}

/// Delete the node at `path`.
///
/// No emptiness check and no recursion: a node that still has children is
/// refused by the store and reported as `NotFound`.
pub async fn delete_node<S: Store + ?Sized>(store: &S, path: &str) -> Result<(), FsError> {
    store
        .delete(path)
        .await
        .map_err(|e| collapse("delete", path, e))?;

    tracing::debug!(path, "deleted node");
    Ok(())
}

/// The store has no move primitive, and read + create + delete would not be
/// atomic, so rename is refused outright.
pub fn rename(from: &str, to: &str) -> Result<(), FsError> {
    tracing::debug!(from, to, "rename refused");
    Err(FsError::Unsupported)
}
