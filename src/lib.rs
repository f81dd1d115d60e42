//! blob-file-sync: mirrors Azure Blob Storage events into an Azure File Share.
//!
//! A `Microsoft.Storage.BlobCreated` event copies the blob into the share at
//! the same path, creating parent directories as needed. A
//! `Microsoft.Storage.BlobDeleted` event removes the file if it exists.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blob_file_sync::{run_invocation, RestBackend, StorageAccountConfig, SyncEvent, Synchronizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StorageAccountConfig::new("<base64 key>", "photos", None)?;
//!     let backend = Arc::new(RestBackend::new(&config, None)?);
//!     let synchronizer = Synchronizer::new(config, backend);
//!
//!     let event = SyncEvent::from_json(r#"{"eventType":"Microsoft.Storage.BlobCreated",
//!         "data":{"url":"https://acct.blob.core.windows.net/photos/cat.png"}}"#)?;
//!     run_invocation(&synchronizer, event.as_ref()).await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod models;
pub mod storage;
pub mod sync;
pub mod xml;

// Re-exports for convenience
pub use config::{Args, StorageAccountConfig, DEFAULT_API_VERSION};
pub use error::{ErrorCode, StorageError, StorageResult, SyncError, SyncResult};
pub use handler::{load_event, run, run_invocation, InvocationOutcome, EXIT_FAILURE};
pub use models::{BlobReference, EventType, FilePath, SyncEvent};
pub use storage::{
    FileHandle, MemoryBackend, MemoryBlobStore, MemoryFileShare, RestBackend, SourceReader,
    StorageBackend, TargetWriter,
};
pub use sync::{SyncAction, Synchronizer};
