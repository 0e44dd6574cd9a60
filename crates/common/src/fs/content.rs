//! Byte-range access over whole-value get/set.
//!
//! The store can only replace a node's value as a whole, so every write and
//! truncate is a fetch-modify-store sequence. Under
//! [`WritePolicy::LastWriterWins`] that sequence is not atomic: two writers
//! that fetch the same base value race, and the later store silently drops
//! the earlier edit. [`WritePolicy::CompareAndSet`] closes the race by
//! storing against the version that was fetched and retrying on conflict.

use crate::store::{Store, StoreError, MAX_PAYLOAD_BYTES};

use super::{collapse, FsError};

/// How the store step of a read-modify-write is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Unconditional set; concurrent edits may be lost
    #[default]
    LastWriterWins,
    /// Versioned set, re-running the whole sequence up to `max_retries`
    /// times when another writer got there first
    CompareAndSet { max_retries: u32 },
}

/// Return up to `length` bytes of the node's value starting at `offset`.
///
/// Reading at or past the end yields an empty buffer.
pub async fn read_range<S: Store + ?Sized>(
    store: &S,
    path: &str,
    offset: u64,
    length: u32,
) -> Result<Vec<u8>, FsError> {
    let (value, _) = store
        .get_data(path)
        .await
        .map_err(|e| collapse("read", path, e))?;

    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    if start >= value.len() {
        return Ok(Vec::new());
    }
    let end = start.saturating_add(length as usize).min(value.len());
    Ok(value[start..end].to_vec())
}

/// Overwrite `[offset, offset + data.len())`, zero-filling any gap past the
/// current end. Returns the number of bytes written.
pub async fn write_range<S: Store + ?Sized>(
    store: &S,
    path: &str,
    offset: u64,
    data: &[u8],
    policy: WritePolicy,
) -> Result<usize, FsError> {
    let end = bounded_len(offset.saturating_add(data.len() as u64))
        .map_err(|e| collapse("write", path, e))?;
    let start = end - data.len();

    modify(store, path, policy, "write", |value| {
        splice(value, start, data);
    })
    .await?;

    tracing::trace!(path, offset, len = data.len(), "wrote range");
    Ok(data.len())
}

/// Resize the value to exactly `new_len` bytes, dropping the tail or
/// zero-padding as needed
pub async fn truncate<S: Store + ?Sized>(
    store: &S,
    path: &str,
    new_len: u64,
    policy: WritePolicy,
) -> Result<(), FsError> {
    let new_len = bounded_len(new_len).map_err(|e| collapse("truncate", path, e))?;

    modify(store, path, policy, "truncate", |value| {
        value.resize(new_len, 0);
    })
    .await?;

    tracing::trace!(path, new_len, "truncated");
    Ok(())
}

/// Fetch the value, apply `edit`, store it back according to `policy`
async fn modify<S, F>(
    store: &S,
    path: &str,
    policy: WritePolicy,
    op: &'static str,
    mut edit: F,
) -> Result<(), FsError>
where
    S: Store + ?Sized,
    F: FnMut(&mut Vec<u8>),
{
    let mut attempt: u32 = 0;

    loop {
        let (mut value, stat) = store
            .get_data(path)
            .await
            .map_err(|e| collapse(op, path, e))?;

        edit(&mut value);

        let expected_version = match policy {
            WritePolicy::LastWriterWins => None,
            WritePolicy::CompareAndSet { .. } => Some(stat.version),
        };

        match store.set_data(path, &value, expected_version).await {
            Ok(_) => return Ok(()),
            Err(StoreError::BadVersion) => {
                let max_retries = match policy {
                    WritePolicy::CompareAndSet { max_retries } => max_retries,
                    // an unconditional set never reports a version conflict
                    WritePolicy::LastWriterWins => 0,
                };
                if attempt >= max_retries {
                    tracing::warn!(op, path, attempts = attempt + 1, "giving up on conflicting writes");
                    return Err(FsError::Conflict);
                }
                attempt += 1;
                tracing::debug!(op, path, attempt, "version changed underneath us, retrying");
            }
            Err(e) => return Err(collapse(op, path, e)),
        }
    }
}

/// Reject lengths the store could never hold before allocating for them
fn bounded_len(len: u64) -> Result<usize, StoreError> {
    match usize::try_from(len) {
        Ok(len) if len <= MAX_PAYLOAD_BYTES => Ok(len),
        _ => Err(StoreError::PayloadTooLarge {
            size: usize::try_from(len).unwrap_or(usize::MAX),
            limit: MAX_PAYLOAD_BYTES,
        }),
    }
}

/// Copy `data` into `value` at `offset`, growing (never shrinking) `value`
fn splice(value: &mut Vec<u8>, offset: usize, data: &[u8]) {
    let end = offset + data.len();
    if value.len() < end {
        value.resize(end, 0);
    }
    value[offset..end].copy_from_slice(data);
}
