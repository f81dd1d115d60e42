//! Invocation configuration.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{ArgAction, Parser};
use std::fmt;
use std::path::PathBuf;

use crate::error::{SyncError, SyncResult};

/// API version sent with every storage request.
pub const DEFAULT_API_VERSION: &str = "2021-10-04";

/// Host label identifying the Blob service endpoint of an account.
pub const BLOB_SERVICE_LABEL: &str = ".blob.";

/// Host label identifying the File service endpoint of the same account.
pub const FILE_SERVICE_LABEL: &str = ".file.";

/// Command-line arguments, each storage setting falling back to its
/// `STORAGE_ACCOUNT__*` environment variable.
#[derive(Parser, Clone)]
#[command(name = "blob-file-sync")]
#[command(about = "Mirrors a Blob Storage event into an Azure File Share")]
#[command(version)]
pub struct Args {
    /// Storage account access key (base64).
    #[arg(long, env = "STORAGE_ACCOUNT__ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Container the events originate from.
    #[arg(long, env = "STORAGE_ACCOUNT__SOURCE_CONTAINER")]
    pub source_container: Option<String>,

    /// Use the source container name as the target share name.
    #[arg(
        long,
        env = "STORAGE_ACCOUNT__SOURCE_CONTAINER_EQUALS_TARGET_SHARE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub source_container_equals_target_share: bool,

    /// File share to write into when it differs from the source container.
    #[arg(long, env = "STORAGE_ACCOUNT__TARGET_SHARE")]
    pub target_share: Option<String>,

    /// Path to the event JSON. Read from stdin when omitted.
    #[arg(long, short = 'e')]
    pub event: Option<PathBuf>,

    /// HTTP timeout per storage request, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Exit with a failure status when the invocation fails.
    #[arg(long)]
    pub propagate_errors: bool,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (errors only).
    #[arg(long, short = 's')]
    pub silent: bool,
}

/// Storage settings for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccountConfig {
    pub access_key: String,
    pub source_container: String,
    pub target_share: String,
}

impl StorageAccountConfig {
    /// Validates and builds the configuration.
    ///
    /// The target share falls back to the source container when no override
    /// is given.
    pub fn new(
        access_key: impl Into<String>,
        source_container: impl Into<String>,
        target_share: Option<String>,
    ) -> SyncResult<Self> {
        let access_key = required("access key", access_key.into())?;
        BASE64
            .decode(&access_key)
            .map_err(|e| SyncError::validation(format!("access key is not valid base64: {}", e)))?;

        let source_container = required("source container", source_container.into())?;
        let target_share = match target_share {
            Some(share) => required("target share", share)?,
            None => source_container.clone(),
        };

        Ok(Self {
            access_key,
            source_container,
            target_share,
        })
    }
}

impl fmt::Debug for StorageAccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccountConfig")
            .field("access_key", &"<redacted>")
            .field("source_container", &self.source_container)
            .field("target_share", &self.target_share)
            .finish()
    }
}

impl TryFrom<&Args> for StorageAccountConfig {
    type Error = SyncError;

    fn try_from(args: &Args) -> SyncResult<Self> {
        let access_key = args
            .access_key
            .clone()
            .ok_or_else(|| SyncError::validation("STORAGE_ACCOUNT__ACCESS_KEY is required"))?;
        let source_container = args
            .source_container
            .clone()
            .ok_or_else(|| SyncError::validation("STORAGE_ACCOUNT__SOURCE_CONTAINER is required"))?;

        // TARGET_SHARE is only consulted when the share differs from the container.
        let target_share = if args.source_container_equals_target_share {
            None
        } else {
            let share = args.target_share.clone().ok_or_else(|| {
                SyncError::validation(
                    "STORAGE_ACCOUNT__TARGET_SHARE is required when the source container \
                     does not equal the target share",
                )
            })?;
            Some(share)
        };

        Self::new(access_key, source_container, target_share)
    }
}

fn required(name: &str, value: String) -> SyncResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SyncError::validation(format!("{} must not be empty", name)));
    }
    Ok(value.to_string())
}
