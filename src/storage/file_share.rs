//! File service client used as the sync target.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use md5::{Digest, Md5};
use reqwest::Method;
use tracing::debug;

use crate::context::{format_range, RequestContext};
use crate::error::{ErrorCode, StorageError, StorageResult};

use super::rest::{resource_url, RestTransport};
use super::{FileHandle, TargetWriter};

/// Largest range a single Put Range call accepts (4 MiB).
pub const MAX_RANGE_SIZE: u64 = 4 * 1024 * 1024;

/// Writes into one share of a File service endpoint.
#[derive(Debug, Clone)]
pub struct FileShareClient {
    endpoint: String,
    share: String,
    transport: RestTransport,
}

impl FileShareClient {
    pub fn new(endpoint: impl Into<String>, share: impl Into<String>, transport: RestTransport) -> Self {
        Self {
            endpoint: endpoint.into(),
            share: share.into(),
            transport,
        }
    }

    pub fn share(&self) -> &str {
        &self.share
    }

    async fn put_range(&self, path: &str, data: Bytes, offset: u64) -> StorageResult<()> {
        let length = data.len() as u64;
        let url = resource_url(&self.endpoint, &self.share, Some(path), &[("comp", "range")])?;
        let content_md5 = BASE64.encode(Md5::digest(&data));
        let ctx = RequestContext::new(Method::PUT, url, self.transport.account())
            .with_header("x-ms-range", format_range(offset, length))
            .with_header("x-ms-write", "update")
            .with_header("content-md5", content_md5)
            .with_body(data);

        self.transport.send(ctx).await?;
        Ok(())
    }
}

#[async_trait]
impl TargetWriter for FileShareClient {
    /// PUT /{share}/{directory}?restype=directory - Create directory.
    async fn ensure_directory(&self, path: &str) -> StorageResult<()> {
        let url = resource_url(&self.endpoint, &self.share, Some(path), &[("restype", "directory")])?;
        let ctx = RequestContext::new(Method::PUT, url, self.transport.account());

        match self.transport.send(ctx).await {
            Ok(_) => {
                debug!(share = %self.share, directory = path, "Created directory");
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                debug!(share = %self.share, directory = path, "Directory already exists");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// PUT /{share}/{path} - Create file.
    async fn create_file(&self, path: &str, size: u64) -> StorageResult<FileHandle> {
        let url = resource_url(&self.endpoint, &self.share, Some(path), &[])?;
        let ctx = RequestContext::new(Method::PUT, url, self.transport.account())
            .with_header("x-ms-type", "file")
            .with_header("x-ms-content-length", size.to_string());

        self.transport.send(ctx).await?;
        Ok(FileHandle {
            path: path.to_string(),
            size,
        })
    }

    /// PUT /{share}/{path}?comp=range - Put range, split at the service limit.
    async fn write_range(
        &self,
        handle: &FileHandle,
        data: Bytes,
        offset: u64,
        length: u64,
    ) -> StorageResult<()> {
        if data.len() as u64 != length {
            return Err(StorageError::with_message(
                ErrorCode::InvalidInput,
                format!("range length {} does not match {} bytes of data", length, data.len()),
            ));
        }
        if offset + length > handle.size {
            return Err(StorageError::new(ErrorCode::InvalidRange));
        }
        // The service rejects empty ranges; a zero-length file needs no write.
        if length == 0 {
            return Ok(());
        }

        let mut written = 0u64;
        while written < length {
            let chunk = (length - written).min(MAX_RANGE_SIZE);
            let slice = data.slice(written as usize..(written + chunk) as usize);
            self.put_range(&handle.path, slice, offset + written).await?;
            written += chunk;
        }
        Ok(())
    }

    /// DELETE /{share}/{path} - Delete file; a missing file is not an error.
    async fn delete_file_if_exists(&self, path: &str) -> StorageResult<bool> {
        let url = resource_url(&self.endpoint, &self.share, Some(path), &[])?;
        let ctx = RequestContext::new(Method::DELETE, url, self.transport.account());

        match self.transport.send(ctx).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
