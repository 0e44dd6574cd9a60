//! Integration tests for unlink / rmdir

mod common;

use ::common::fs::FsError;

#[tokio::test]
async fn test_rm_then_getattr_is_not_found() {
    let (fs, _) = common::setup_test_env();

    common::seed_file(&fs, "/file", b"data").await;
    fs.unlink("/file").await.unwrap();

    assert_eq!(fs.getattr("/file").await, Err(FsError::NotFound));
    assert!(fs.readdir("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rmdir_empty_dir() {
    let (fs, _) = common::setup_test_env();

    fs.mkdir("/dir", 0o755).await.unwrap();
    fs.rmdir("/dir").await.unwrap();
    assert_eq!(fs.getattr("/dir").await, Err(FsError::NotFound));
}

#[tokio::test]
async fn test_rmdir_non_empty_is_refused() {
    let (fs, _) = common::setup_test_env();

    fs.mkdir("/dir", 0o755).await.unwrap();
    fs.create("/dir/file", 0o644).await.unwrap();

    // No recursive delete; the store refuses and we report ENOENT
    assert_eq!(fs.rmdir("/dir").await, Err(FsError::NotFound));
    assert!(fs.getattr("/dir/file").await.is_ok());
}

#[tokio::test]
async fn test_unlink_works_on_directories_too() {
    let (fs, _) = common::setup_test_env();

    fs.mkdir("/dir", 0o755).await.unwrap();
    fs.unlink("/dir").await.unwrap();
    assert_eq!(fs.getattr("/dir").await, Err(FsError::NotFound));
}

#[tokio::test]
async fn test_rm_missing() {
    let (fs, _) = common::setup_test_env();
    assert_eq!(fs.unlink("/missing").await, Err(FsError::NotFound));
}
