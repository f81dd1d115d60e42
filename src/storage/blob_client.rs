//! Blob service client used as the sync source.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use md5::{Digest, Md5};
use reqwest::Method;

use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};

use super::rest::{resource_url, RestTransport};
use super::SourceReader;

/// Reads blobs from one Blob service endpoint.
#[derive(Debug, Clone)]
pub struct BlobServiceClient {
    endpoint: String,
    transport: RestTransport,
}

impl BlobServiceClient {
    pub fn new(endpoint: impl Into<String>, transport: RestTransport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SourceReader for BlobServiceClient {
    /// GET /{container}/{blob} - Download blob.
    async fn download_full(&self, container: &str, blob_path: &str) -> StorageResult<Bytes> {
        let url = resource_url(&self.endpoint, container, Some(blob_path), &[])?;
        let ctx = RequestContext::new(Method::GET, url, self.transport.account());

        let response = self.transport.send(ctx).await?;
        let expected_md5 = response
            .headers()
            .get("content-md5")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        if let Some(expected_md5) = expected_md5 {
            let computed_md5 = BASE64.encode(Md5::digest(&body));
            if computed_md5 != expected_md5 {
                return Err(StorageError::with_message(
                    ErrorCode::Md5Mismatch,
                    format!(
                        "downloaded content of '{}/{}' does not match its Content-MD5",
                        container, blob_path
                    ),
                ));
            }
        }

        Ok(body)
    }
}
