//! End-to-end walk through the dispatcher, the way a mount would drive it

mod common;

use ::common::fs::{FsCall, NodeKind, Payload};

#[tokio::test]
async fn test_data_node_lifecycle() {
    let (fs, _) = common::setup_test_env();

    let created = fs
        .dispatch(FsCall::Create {
            path: "/data",
            mode: 0o644,
        })
        .await;
    assert_eq!(created.code, 0);

    let written = fs
        .dispatch(FsCall::Write {
            path: "/data",
            offset: 0,
            data: b"hello",
        })
        .await;
    assert_eq!(written.code, 5);

    let read = fs
        .dispatch(FsCall::Read {
            path: "/data",
            offset: 0,
            size: 5,
        })
        .await;
    assert_eq!(read.code, 5);
    assert_eq!(read.payload, Some(Payload::Bytes(b"hello".to_vec())));

    let child = fs
        .dispatch(FsCall::Create {
            path: "/data/child",
            mode: 0o644,
        })
        .await;
    assert_eq!(child.code, 0);

    let attr = fs.dispatch(FsCall::GetAttr { path: "/data" }).await;
    match attr.payload {
        Some(Payload::Attributes(attr)) => {
            assert_eq!(attr.kind, NodeKind::Directory);
            // the value written earlier is still there
            assert_eq!(attr.size, 5);
        }
        other => panic!("unexpected payload: {:?}", other),
    }

    // Still has a child, so the store refuses the delete
    let removed = fs.dispatch(FsCall::RmDir { path: "/data" }).await;
    assert!(removed.code < 0);
    assert_eq!(removed.code, -libc::ENOENT);

    let listing = fs.dispatch(FsCall::ReadDir { path: "/data" }).await;
    assert_eq!(listing.payload, Some(Payload::Names(vec!["child".to_string()])));
}

#[tokio::test]
async fn test_truncate_and_unlink_codes() {
    let (fs, _) = common::setup_test_env();

    common::seed_file(&fs, "/f", b"abcdef").await;

    let truncated = fs.dispatch(FsCall::Truncate { path: "/f", size: 2 }).await;
    assert_eq!(truncated.code, 0);

    let unlinked = fs.dispatch(FsCall::Unlink { path: "/f" }).await;
    assert_eq!(unlinked.code, 0);

    let gone = fs.dispatch(FsCall::GetAttr { path: "/f" }).await;
    assert_eq!(gone.code, -libc::ENOENT);
    assert_eq!(gone.payload, None);
}
