//! Integration tests for create / mkdir

mod common;

use ::common::fs::{FsError, NodeKind};
use ::common::store::Store;

#[tokio::test]
async fn test_create_fresh_path() {
    let (fs, store) = common::setup_test_env();

    fs.create("/file", 0o644).await.unwrap();

    // A subsequent existence check finds it
    assert!(store.exists("/file").await.unwrap().is_some());
    let attr = fs.getattr("/file").await.unwrap();
    assert_eq!(attr.kind, NodeKind::Regular);
    assert_eq!(attr.size, 0);
}

#[tokio::test]
async fn test_create_existing_path_fails() {
    let (fs, _) = common::setup_test_env();

    fs.create("/file", 0o644).await.unwrap();
    assert_eq!(fs.create("/file", 0o644).await, Err(FsError::AlreadyExists));
    assert_eq!(fs.mkdir("/file", 0o755).await, Err(FsError::AlreadyExists));
}

#[tokio::test]
async fn test_mkdir_is_an_empty_node() {
    let (fs, _) = common::setup_test_env();

    fs.mkdir("/dir", 0o755).await.unwrap();

    // Without children a directory cannot be told apart from an empty file
    let attr = fs.getattr("/dir").await.unwrap();
    assert_eq!(attr.kind, NodeKind::Regular);
    assert_eq!(attr.perm, 0o666);
}

#[tokio::test]
async fn test_mkdir_nested_requires_parent() {
    let (fs, _) = common::setup_test_env();

    // Parents are not created automatically
    assert_eq!(fs.mkdir("/a/b/c", 0o755).await, Err(FsError::NotFound));

    fs.mkdir("/a", 0o755).await.unwrap();
    fs.mkdir("/a/b", 0o755).await.unwrap();
    fs.mkdir("/a/b/c", 0o755).await.unwrap();
    assert_eq!(fs.readdir("/a/b").await.unwrap(), vec!["c"]);
}

#[tokio::test]
async fn test_create_during_outage_is_not_found() {
    let (fs, store) = common::setup_test_env();

    store.set_available(false);
    assert_eq!(fs.create("/file", 0o644).await, Err(FsError::NotFound));
}
