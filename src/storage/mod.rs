//! Storage capabilities used by the synchronizer, with REST and in-memory
//! implementations.

mod blob_client;
mod file_share;
mod memory;
mod rest;

pub use blob_client::*;
pub use file_share::*;
pub use memory::*;
pub use rest::*;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::{StorageResult, SyncResult};

/// Read access to source blobs.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Downloads the whole blob into memory.
    async fn download_full(&self, container: &str, blob_path: &str) -> StorageResult<Bytes>;
}

/// A file created in the target share, ready for range writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Path relative to the share root.
    pub path: String,
    /// Size the file was created with.
    pub size: u64,
}

/// Write access to the target file share. Paths are relative to the share root.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Creates the directory if absent. The parent must already exist.
    async fn ensure_directory(&self, path: &str) -> StorageResult<()>;

    /// Creates (or replaces) a zero-filled file of `size` bytes.
    async fn create_file(&self, path: &str, size: u64) -> StorageResult<FileHandle>;

    /// Writes `length` bytes of `data` at `offset`.
    async fn write_range(
        &self,
        handle: &FileHandle,
        data: Bytes,
        offset: u64,
        length: u64,
    ) -> StorageResult<()>;

    /// Deletes the file; returns false when it did not exist.
    async fn delete_file_if_exists(&self, path: &str) -> StorageResult<bool>;
}

/// Connects readers and writers for the endpoints named in an event.
pub trait StorageBackend: Send + Sync {
    /// Reader for the Blob service at `blob_host_url` (`scheme://host`).
    fn source_reader(&self, blob_host_url: &str) -> SyncResult<Arc<dyn SourceReader>>;

    /// Writer for `share` on the File service at `file_host_url`.
    fn target_writer(&self, file_host_url: &str, share: &str) -> SyncResult<Arc<dyn TargetWriter>>;
}
