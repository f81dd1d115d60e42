//! End-to-end synchronizer tests against the fake storage endpoint.

mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use md5::{Digest, Md5};

use blob_file_sync::models::{BLOB_CREATED_EVENT, BLOB_DELETED_EVENT};
use blob_file_sync::{
    run_invocation, ErrorCode, InvocationOutcome, StorageError, SyncAction, SyncError, SyncEvent,
};
use common::FakeStorage;

#[tokio::test]
async fn test_created_event_copies_blob_into_share() {
    let storage = FakeStorage::start().await;
    storage.put_blob("mycontainer", "dir1/dir2/file.txt", &[1, 2, 3]);
    let sync = storage.synchronizer("mycontainer", None);

    let event = SyncEvent::new(
        BLOB_CREATED_EVENT,
        storage.blob_url("mycontainer", "dir1/dir2/file.txt"),
    );
    let action = sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(
        action,
        SyncAction::Created {
            path: "dir1/dir2/file.txt".to_string(),
            bytes: 3
        }
    );
    assert_eq!(
        storage.request_lines(),
        vec![
            "GET /mycontainer/dir1/dir2/file.txt",
            "PUT /mycontainer/dir1?restype=directory",
            "PUT /mycontainer/dir1/dir2?restype=directory",
            "PUT /mycontainer/dir1/dir2/file.txt",
            "PUT /mycontainer/dir1/dir2/file.txt?comp=range",
        ]
    );
    assert_eq!(storage.file("dir1/dir2/file.txt"), Some(vec![1, 2, 3]));

    let requests = storage.requests();
    let create = &requests[3];
    assert_eq!(create.header("x-ms-type"), Some("file"));
    assert_eq!(create.header("x-ms-content-length"), Some("3"));

    let range = &requests[4];
    assert_eq!(range.header("x-ms-range"), Some("bytes=0-2"));
    assert_eq!(range.header("x-ms-write"), Some("update"));
    assert_eq!(
        range.header("content-md5").map(String::from),
        Some(BASE64.encode(Md5::digest([1u8, 2, 3])))
    );
    assert_eq!(range.body, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_requests_are_signed_for_the_account() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "f.txt", b"hello");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "f.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    // The account is the host label before the first dot: "127" for 127.0.0.1.
    for request in storage.requests() {
        let auth = request.header("authorization").unwrap();
        assert!(auth.starts_with("SharedKey 127:"), "unexpected auth {}", auth);
        assert_eq!(request.header("x-ms-version"), Some("2021-10-04"));
        assert!(request.header("x-ms-date").is_some());
        assert!(request.header("x-ms-client-request-id").is_some());
    }
}

#[tokio::test]
async fn test_existing_directories_are_tolerated() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "a/b/f.txt", b"new");
    storage.put_directory("a");
    storage.put_directory("a/b");
    storage.put_file("a/b/f.txt", b"older content");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "a/b/f.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(storage.file("a/b/f.txt"), Some(b"new".to_vec()));
}

#[tokio::test]
async fn test_created_event_writes_into_target_share() {
    let storage = FakeStorage::start().await;
    storage.put_blob("source", "f.txt", b"x");
    let sync = storage.synchronizer("source", Some("mirror"));

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("source", "f.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(
        storage.request_lines(),
        vec!["GET /source/f.txt", "PUT /mirror/f.txt", "PUT /mirror/f.txt?comp=range"]
    );
}

#[tokio::test]
async fn test_empty_blob_creates_empty_file_without_range_write() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "empty.txt", b"");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "empty.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(storage.request_lines(), vec!["GET /c/empty.txt", "PUT /c/empty.txt"]);
    assert_eq!(storage.file("empty.txt"), Some(Vec::new()));
}

#[tokio::test]
async fn test_blob_names_with_spaces_are_escaped_once() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "my%20docs/a%20b.txt", b"x");
    let sync = storage.synchronizer("c", None);

    // Event URLs carry the escaped blob name.
    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "my%20docs/a%20b.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(storage.request_lines()[0], "GET /c/my%20docs/a%20b.txt");
}

#[tokio::test]
async fn test_missing_blob_reports_blob_not_found() {
    let storage = FakeStorage::start().await;
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "nope.txt"));
    let err = sync.handle_event(Some(&event)).await.unwrap_err();

    match err {
        SyncError::Storage(StorageError {
            code,
            status,
            request_id,
            message,
        }) => {
            assert_eq!(code, ErrorCode::BlobNotFound);
            assert_eq!(status, Some(404));
            assert_eq!(request_id.as_deref(), Some("fake-request"));
            assert_eq!(message, "BlobNotFound returned by fake storage");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(storage.request_lines(), vec!["GET /c/nope.txt"]);
}

#[tokio::test]
async fn test_content_md5_mismatch_aborts_before_upload() {
    let storage = FakeStorage::start().await;
    storage.put_blob_with_md5("c", "f.txt", b"abc", "AAAAAAAAAAAAAAAAAAAAAA==");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "f.txt"));
    let err = sync.handle_event(Some(&event)).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Storage(StorageError { code: ErrorCode::Md5Mismatch, .. })
    ));
    assert_eq!(storage.request_lines(), vec!["GET /c/f.txt"]);
}

#[tokio::test]
async fn test_large_blob_is_written_in_4_mib_ranges() {
    const MIB: usize = 1024 * 1024;
    let data: Vec<u8> = (0..9 * MIB + 5).map(|i| (i % 251) as u8).collect();

    let storage = FakeStorage::start().await;
    storage.put_blob("c", "big.bin", &data);
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "big.bin"));
    let action = sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(
        action,
        SyncAction::Created {
            path: "big.bin".to_string(),
            bytes: data.len() as u64
        }
    );
    let ranges: Vec<String> = storage
        .requests()
        .iter()
        .filter_map(|r| r.header("x-ms-range").map(String::from))
        .collect();
    assert_eq!(
        ranges,
        vec!["bytes=0-4194303", "bytes=4194304-8388607", "bytes=8388608-9437188"]
    );
    for request in storage.requests().iter().filter(|r| r.header("x-ms-range").is_some()) {
        assert_eq!(
            request.header("content-md5").map(String::from),
            Some(BASE64.encode(Md5::digest(&request.body)))
        );
    }
    assert_eq!(storage.file("big.bin"), Some(data));
}

#[tokio::test]
async fn test_directory_conflict_with_unknown_code_is_not_swallowed() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "a/f.txt", b"x");
    storage.fail_with("PUT /c/a?restype=directory", 409, "ResourceTypeMismatch");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "a/f.txt"));
    let err = sync.handle_event(Some(&event)).await.unwrap_err();

    match err {
        SyncError::Storage(StorageError {
            code,
            status,
            message,
            ..
        }) => {
            assert_eq!(code, ErrorCode::Unrecognized);
            assert_eq!(status, Some(409));
            assert!(message.starts_with("ResourceTypeMismatch"), "unexpected message {}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        storage.request_lines(),
        vec!["GET /c/a/f.txt", "PUT /c/a?restype=directory"]
    );
}

#[tokio::test]
async fn test_directory_conflict_with_known_code_is_tolerated() {
    let storage = FakeStorage::start().await;
    storage.put_blob("c", "a/f.txt", b"x");
    storage.put_directory("a");
    storage.fail_with("PUT /c/a?restype=directory", 409, "ResourceAlreadyExists");
    let sync = storage.synchronizer("c", None);

    let event = SyncEvent::new(BLOB_CREATED_EVENT, storage.blob_url("c", "a/f.txt"));
    sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(storage.file("a/f.txt"), Some(b"x".to_vec()));
}

#[tokio::test]
async fn test_deleted_event_deletes_file() {
    let storage = FakeStorage::start().await;
    storage.put_file("file.txt", b"old");
    let sync = storage.synchronizer("mycontainer", None);

    let event = SyncEvent::new(BLOB_DELETED_EVENT, storage.blob_url("mycontainer", "file.txt"));
    let action = sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(
        action,
        SyncAction::Deleted {
            path: "file.txt".to_string(),
            existed: true
        }
    );
    assert_eq!(storage.request_lines(), vec!["DELETE /mycontainer/file.txt"]);
    assert_eq!(storage.file("file.txt"), None);
}

#[tokio::test]
async fn test_deleting_missing_file_is_not_an_error() {
    let storage = FakeStorage::start().await;
    let sync = storage.synchronizer("mycontainer", None);

    let event = SyncEvent::new(BLOB_DELETED_EVENT, storage.blob_url("mycontainer", "file.txt"));
    let action = sync.handle_event(Some(&event)).await.unwrap();

    assert_eq!(
        action,
        SyncAction::Deleted {
            path: "file.txt".to_string(),
            existed: false
        }
    );
}

#[tokio::test]
async fn test_deleting_under_missing_directory_fails() {
    let storage = FakeStorage::start().await;
    let sync = storage.synchronizer("mycontainer", None);

    let event = SyncEvent::new(BLOB_DELETED_EVENT, storage.blob_url("mycontainer", "gone/file.txt"));
    let err = sync.handle_event(Some(&event)).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Storage(StorageError { code: ErrorCode::ParentNotFound, .. })
    ));
}

#[tokio::test]
async fn test_unknown_event_makes_no_requests() {
    let storage = FakeStorage::start().await;
    let sync = storage.synchronizer("mycontainer", None);

    let event = SyncEvent::new(
        "Microsoft.Storage.BlobRenamed",
        storage.blob_url("mycontainer", "file.txt"),
    );
    let outcome = run_invocation(&sync, Some(&event)).await;

    assert_eq!(
        outcome,
        InvocationOutcome::Skipped("Microsoft.Storage.BlobRenamed".to_string())
    );
    assert!(storage.requests().is_empty());
}
