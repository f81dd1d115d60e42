//! Shared plumbing for the Blob and File REST clients.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::auth::SharedKeyCredential;
use crate::config::StorageAccountConfig;
use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult, SyncError, SyncResult};
use crate::models::account_name_from_host_url;
use crate::xml::ErrorBody;

use super::{BlobServiceClient, FileShareClient, SourceReader, StorageBackend, TargetWriter};

/// Everything except unreserved characters and '/' is escaped in paths.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Builds `{endpoint}/{root}/{path}?{query}`.
///
/// Escapes already present in `path` are kept rather than escaped twice, so
/// paths copied from an event URL resolve to the same resource.
pub(crate) fn resource_url(
    endpoint: &str,
    root: &str,
    path: Option<&str>,
    query: &[(&str, &str)],
) -> StorageResult<Url> {
    let mut raw = format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        utf8_percent_encode(root, PATH_ENCODE_SET)
    );
    if let Some(path) = path {
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        raw.push('/');
        raw.push_str(&utf8_percent_encode(&decoded, PATH_ENCODE_SET).to_string());
    }
    if !query.is_empty() {
        let query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        raw.push('?');
        raw.push_str(&query);
    }

    Url::parse(&raw).map_err(|e| {
        StorageError::with_message(ErrorCode::InvalidUri, format!("invalid request url '{}': {}", raw, e))
    })
}

/// Signs and sends requests for one account.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    credential: SharedKeyCredential,
}

impl RestTransport {
    pub fn new(client: reqwest::Client, credential: SharedKeyCredential) -> Self {
        Self { client, credential }
    }

    pub fn account(&self) -> &str {
        self.credential.account()
    }

    /// Sends the request; non-success responses become a `StorageError`.
    pub async fn send(&self, ctx: RequestContext) -> StorageResult<reqwest::Response> {
        let authorization = self.credential.sign(&ctx)?;
        let request_id = ctx.request_id.clone();
        debug!(
            method = %ctx.method,
            url = %ctx.url,
            request_id = %request_id,
            "Sending storage request"
        );

        let response = ctx.into_request(&self.client, authorization).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let error = error_from_response(response).await;
            debug!(request_id = %request_id, code = error.code.as_str(), "Storage request failed");
            Err(error)
        }
    }
}

/// Converts a failed response into a `StorageError`, preferring the
/// `x-ms-error-code` header over the XML body.
pub(crate) async fn error_from_response(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let header_code = header("x-ms-error-code");
    let request_id = header("x-ms-request-id");

    let body = response.text().await.unwrap_or_default();
    let parsed = ErrorBody::parse(&body);
    let raw_code = header_code.or_else(|| parsed.code.clone());

    // The status only classifies responses that carried no code at all.
    let (code, unknown_code) = match raw_code.as_deref() {
        Some(raw) => match ErrorCode::from_code(raw) {
            Some(code) => (code, None),
            None => (ErrorCode::Unrecognized, Some(raw)),
        },
        None => (ErrorCode::from_status(status), None),
    };
    let message = match (unknown_code, parsed.summary()) {
        (Some(raw), Some(summary)) => format!("{}: {}", raw, summary),
        (Some(raw), None) => raw.to_string(),
        (None, Some(summary)) => summary.to_string(),
        (None, None) => code.default_message().to_string(),
    };

    let mut error = StorageError::with_message(code, message).with_status(status);
    if let Some(request_id) = request_id {
        error = error.with_request_id(request_id);
    }
    error
}

/// Connects REST clients authenticated with the account access key.
pub struct RestBackend {
    client: reqwest::Client,
    access_key: String,
}

impl RestBackend {
    pub fn new(config: &StorageAccountConfig, timeout: Option<Duration>) -> SyncResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::validation(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            access_key: config.access_key.clone(),
        })
    }

    fn transport(&self, host_url: &str) -> SyncResult<RestTransport> {
        let account = account_name_from_host_url(host_url)?;
        let credential = SharedKeyCredential::new(account, &self.access_key)?;
        Ok(RestTransport::new(self.client.clone(), credential))
    }
}

impl StorageBackend for RestBackend {
    fn source_reader(&self, blob_host_url: &str) -> SyncResult<Arc<dyn SourceReader>> {
        let transport = self.transport(blob_host_url)?;
        Ok(Arc::new(BlobServiceClient::new(blob_host_url, transport)))
    }

    fn target_writer(&self, file_host_url: &str, share: &str) -> SyncResult<Arc<dyn TargetWriter>> {
        let transport = self.transport(file_host_url)?;
        Ok(Arc::new(FileShareClient::new(file_host_url, share, transport)))
    }
}
