//! In-memory storage that records every operation in call order.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ErrorCode, StorageError, StorageResult, SyncResult};
use crate::models::account_name_from_host_url;

use super::{FileHandle, SourceReader, StorageBackend, TargetWriter};

/// Key type for blobs - (container, path).
type BlobKey = (Arc<str>, Arc<str>);

/// In-memory blob source.
pub struct MemoryBlobStore {
    blobs: DashMap<BlobKey, Bytes>,
    downloads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Create a blob key.
    #[inline]
    fn blob_key(container: &str, path: &str) -> BlobKey {
        (Arc::from(container), Arc::from(path))
    }

    pub fn insert(&self, container: &str, path: &str, data: impl Into<Bytes>) {
        self.blobs.insert(Self::blob_key(container, path), data.into());
    }

    /// Number of download calls made, successful or not.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceReader for MemoryBlobStore {
    async fn download_full(&self, container: &str, blob_path: &str) -> StorageResult<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(&Self::blob_key(container, blob_path))
            .map(|b| b.value().clone())
            .ok_or_else(|| StorageError::new(ErrorCode::BlobNotFound).with_status(404))
    }
}

/// One call made against a `MemoryFileShare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOperation {
    EnsureDirectory(String),
    CreateFile { path: String, size: u64 },
    WriteRange { path: String, data: Vec<u8>, offset: u64, length: u64 },
    DeleteFileIfExists(String),
}

/// In-memory file share enforcing the File service's parent-directory rules.
pub struct MemoryFileShare {
    directories: DashSet<Arc<str>>,
    files: DashMap<Arc<str>, Vec<u8>>,
    operations: Mutex<Vec<ShareOperation>>,
}

impl MemoryFileShare {
    pub fn new() -> Self {
        Self {
            directories: DashSet::new(),
            files: DashMap::new(),
            operations: Mutex::new(Vec::new()),
        }
    }

    /// Pre-creates a directory chain without recording operations.
    pub fn with_directory(self, path: &str) -> Self {
        let mut current = String::new();
        for segment in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.directories.insert(Arc::from(current.as_str()));
        }
        self
    }

    /// Pre-creates a file without recording operations.
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files.insert(Arc::from(path), data.to_vec());
        self
    }

    /// Operations in call order.
    pub fn operations(&self) -> Vec<ShareOperation> {
        self.operations.lock().clone()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).map(|f| f.value().clone())
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    fn record(&self, operation: ShareOperation) {
        self.operations.lock().push(operation);
    }

    fn check_parent(&self, path: &str) -> StorageResult<()> {
        match path.rsplit_once('/') {
            Some((parent, _)) if !self.directories.contains(parent) => {
                Err(StorageError::new(ErrorCode::ParentNotFound).with_status(404))
            }
            _ => Ok(()),
        }
    }
}

impl Default for MemoryFileShare {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetWriter for MemoryFileShare {
    async fn ensure_directory(&self, path: &str) -> StorageResult<()> {
        self.record(ShareOperation::EnsureDirectory(path.to_string()));
        self.check_parent(path)?;
        self.directories.insert(Arc::from(path));
        Ok(())
    }

    async fn create_file(&self, path: &str, size: u64) -> StorageResult<FileHandle> {
        self.record(ShareOperation::CreateFile {
            path: path.to_string(),
            size,
        });
        self.check_parent(path)?;
        self.files.insert(Arc::from(path), vec![0; size as usize]);
        Ok(FileHandle {
            path: path.to_string(),
            size,
        })
    }

    async fn write_range(
        &self,
        handle: &FileHandle,
        data: Bytes,
        offset: u64,
        length: u64,
    ) -> StorageResult<()> {
        self.record(ShareOperation::WriteRange {
            path: handle.path.clone(),
            data: data.to_vec(),
            offset,
            length,
        });

        let mut file = self
            .files
            .get_mut(handle.path.as_str())
            .ok_or_else(|| StorageError::new(ErrorCode::ResourceNotFound).with_status(404))?;
        let end = offset + length;
        if data.len() as u64 != length || end > file.len() as u64 {
            return Err(StorageError::new(ErrorCode::InvalidRange).with_status(416));
        }
        file[offset as usize..end as usize].copy_from_slice(&data);
        Ok(())
    }

    async fn delete_file_if_exists(&self, path: &str) -> StorageResult<bool> {
        self.record(ShareOperation::DeleteFileIfExists(path.to_string()));
        self.check_parent(path)?;
        Ok(self.files.remove(path).is_some())
    }
}

/// Endpoint a `MemoryBackend` was asked to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Blob { host_url: String, account: String },
    File { host_url: String, account: String, share: String },
}

/// Backend serving one blob store and one file share regardless of host.
pub struct MemoryBackend {
    pub blobs: Arc<MemoryBlobStore>,
    pub share: Arc<MemoryFileShare>,
    connections: Mutex<Vec<Connection>>,
}

impl MemoryBackend {
    pub fn new(blobs: MemoryBlobStore, share: MemoryFileShare) -> Self {
        Self {
            blobs: Arc::new(blobs),
            share: Arc::new(share),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Connections made so far, in order.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.lock().clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MemoryBlobStore::new(), MemoryFileShare::new())
    }
}

impl StorageBackend for MemoryBackend {
    fn source_reader(&self, blob_host_url: &str) -> SyncResult<Arc<dyn SourceReader>> {
        let account = account_name_from_host_url(blob_host_url)?;
        self.connections.lock().push(Connection::Blob {
            host_url: blob_host_url.to_string(),
            account,
        });
        Ok(self.blobs.clone())
    }

    fn target_writer(&self, file_host_url: &str, share: &str) -> SyncResult<Arc<dyn TargetWriter>> {
        let account = account_name_from_host_url(file_host_url)?;
        self.connections.lock().push(Connection::File {
            host_url: file_host_url.to_string(),
            account,
            share: share.to_string(),
        });
        Ok(self.share.clone())
    }
}
