//! Blob URL decomposition and endpoint translation.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::{BLOB_SERVICE_LABEL, FILE_SERVICE_LABEL};
use crate::error::{SyncError, SyncResult};

/// `scheme://host/container/path`, where the path keeps its inner slashes.
const BLOB_URL_PATTERN: &str =
    r"^(?P<protocol>https?)://(?P<host>[^/]+)/(?P<container>[^/]+)/(?P<path>.+)$";

/// Account name is the host label in front of the first dot.
const ACCOUNT_NAME_PATTERN: &str = r"^https?://(?P<account>[^./]+)\.[^/]";

fn blob_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BLOB_URL_PATTERN).expect("blob URL pattern is valid"))
}

fn account_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ACCOUNT_NAME_PATTERN).expect("account name pattern is valid"))
}

/// A blob located by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReference {
    /// `http` or `https`.
    pub protocol: String,
    /// Host including any port, e.g. `acct.blob.core.windows.net`.
    pub host: String,
    pub container_name: String,
    /// Path inside the container; always ends with `leaf_name`.
    pub path: String,
    /// Last segment of `path`.
    pub leaf_name: String,
}

impl BlobReference {
    /// Parses a blob URL such as `https://acct.blob.core.windows.net/photos/2024/cat.png`.
    pub fn parse(url: &str) -> SyncResult<Self> {
        if url.is_empty() {
            return Err(SyncError::parse("unable to parse blob url: url is empty"));
        }

        let captures = blob_url_regex().captures(url).ok_or_else(|| {
            SyncError::parse(format!(
                "unable to parse blob url '{}': expected scheme://host/container/path",
                url
            ))
        })?;

        let path = captures["path"].to_string();
        let leaf_name = match path.rsplit('/').next() {
            Some(leaf) if !leaf.is_empty() => leaf.to_string(),
            _ => {
                return Err(SyncError::parse(format!(
                    "unable to parse blob url '{}': path has no blob name",
                    url
                )))
            }
        };

        Ok(Self {
            protocol: captures["protocol"].to_string(),
            host: captures["host"].to_string(),
            container_name: captures["container"].to_string(),
            path,
            leaf_name,
        })
    }

    /// Scheme and host of the Blob service endpoint.
    pub fn host_url(&self) -> String {
        format!("{}://{}", self.protocol, self.host)
    }

    /// Scheme and host of the File service endpoint of the same account.
    pub fn file_host_url(&self) -> String {
        file_host_url(&self.host_url())
    }

    pub fn account_name(&self) -> SyncResult<String> {
        account_name_from_host_url(&self.host_url())
    }
}

/// Swaps the first Blob service label for the File service label.
pub fn file_host_url(blob_host_url: &str) -> String {
    blob_host_url.replacen(BLOB_SERVICE_LABEL, FILE_SERVICE_LABEL, 1)
}

/// Extracts the account name from a `scheme://host` URL.
pub fn account_name_from_host_url(url: &str) -> SyncResult<String> {
    account_name_regex()
        .captures(url)
        .map(|c| c["account"].to_string())
        .ok_or_else(|| {
            SyncError::parse(format!("unable to extract account name from host url: {}", url))
        })
}
