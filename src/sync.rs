//! Routes storage events to create and delete flows against the file share.
//!
//! Every call is awaited in order: parent directories before children, file
//! creation before the content write. Nothing is rolled back on failure, and
//! concurrent invocations for the same path are not coordinated (last writer
//! wins).

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StorageAccountConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{BlobReference, EventType, FilePath, SyncEvent};
use crate::storage::StorageBackend;

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A file was written to the share.
    Created { path: String, bytes: u64 },
    /// A delete was requested; `existed` is false when the file was absent.
    Deleted { path: String, existed: bool },
    /// The event type is not handled.
    Skipped { event_type: String },
}

/// Mirrors blob events into the configured file share.
pub struct Synchronizer {
    config: StorageAccountConfig,
    backend: Arc<dyn StorageBackend>,
}

impl Synchronizer {
    pub fn new(config: StorageAccountConfig, backend: Arc<dyn StorageBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &StorageAccountConfig {
        &self.config
    }

    /// Handles one event. `None` stands for a missing event payload.
    pub async fn handle_event(&self, event: Option<&SyncEvent>) -> SyncResult<SyncAction> {
        let event = event.ok_or_else(|| SyncError::validation("invalid event: no event received"))?;
        let url = event.source_url();
        if url.is_empty() {
            return Err(SyncError::parse("unable to parse blob url: url is empty"));
        }

        match &event.event_type {
            EventType::BlobCreated => {
                info!(event_id = ?event.id, "Handling blob created event...");
                let blob = self.parse_source(url)?;
                self.handle_blob_created(&blob).await
            }
            EventType::BlobDeleted => {
                info!(event_id = ?event.id, "Handling blob deleted event...");
                let blob = self.parse_source(url)?;
                self.handle_blob_deleted(&blob).await
            }
            EventType::Other(other) => {
                info!("Unknown event type '{}', skipping...", other);
                Ok(SyncAction::Skipped {
                    event_type: other.clone(),
                })
            }
        }
    }

    fn parse_source(&self, url: &str) -> SyncResult<BlobReference> {
        let blob = BlobReference::parse(url)?;
        if blob.container_name != self.config.source_container {
            warn!(
                container = %blob.container_name,
                configured = %self.config.source_container,
                "Event container differs from the configured source container"
            );
        }
        Ok(blob)
    }

    async fn handle_blob_created(&self, blob: &BlobReference) -> SyncResult<SyncAction> {
        let target = FilePath::resolve(&blob.path)?;
        let reader = self.backend.source_reader(&blob.host_url())?;

        info!(
            "Starting download of '{}' from container '{}'",
            blob.path, blob.container_name
        );
        let content = reader.download_full(&blob.container_name, &blob.path).await?;
        let length = content.len() as u64;
        info!(bytes = length, "Download finished");

        let writer = self
            .backend
            .target_writer(&blob.file_host_url(), &self.config.target_share)?;

        info!(share = %self.config.target_share, "Starting upload of '{}'", blob.path);
        for directory in target.directory_paths() {
            writer.ensure_directory(&directory).await?;
        }
        let path = target.full_path();
        let handle = writer.create_file(&path, length).await?;
        writer.write_range(&handle, content, 0, length).await?;
        info!(bytes = length, "Upload finished");

        Ok(SyncAction::Created { path, bytes: length })
    }

    async fn handle_blob_deleted(&self, blob: &BlobReference) -> SyncResult<SyncAction> {
        let target = FilePath::resolve(&blob.path)?;
        let writer = self
            .backend
            .target_writer(&blob.file_host_url(), &self.config.target_share)?;

        info!(share = %self.config.target_share, "Deleting file '{}'", blob.path);
        let path = target.full_path();
        let existed = writer.delete_file_if_exists(&path).await?;
        if existed {
            info!("Deletion finished");
        } else {
            info!("Deletion finished, file did not exist");
        }

        Ok(SyncAction::Deleted { path, existed })
    }
}
