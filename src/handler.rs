//! Invocation entry point: loads the event and contains failures.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use crate::config::{Args, StorageAccountConfig};
use crate::error::{SyncError, SyncResult};
use crate::models::SyncEvent;
use crate::storage::RestBackend;
use crate::sync::{SyncAction, Synchronizer};

/// Process exit status for a failed invocation or unusable configuration.
pub const EXIT_FAILURE: u8 = 1;

/// Result of one invocation as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Completed(SyncAction),
    /// The event type is not synchronized.
    Skipped(String),
    /// The error was logged and not re-raised.
    Failed(String),
}

impl InvocationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InvocationOutcome::Failed(_))
    }

    /// Exit status for this outcome. Failures are only surfaced when
    /// `propagate_errors` is set.
    pub fn exit_code(&self, propagate_errors: bool) -> u8 {
        if propagate_errors && self.is_failed() {
            EXIT_FAILURE
        } else {
            0
        }
    }
}

/// Runs the synchronizer for one event, logging any error instead of
/// returning it.
pub async fn run_invocation(
    synchronizer: &Synchronizer,
    event: Option<&SyncEvent>,
) -> InvocationOutcome {
    match synchronizer.handle_event(event).await {
        Ok(SyncAction::Skipped { event_type }) => InvocationOutcome::Skipped(event_type),
        Ok(action) => {
            info!(?action, "Invocation completed");
            InvocationOutcome::Completed(action)
        }
        Err(err) => {
            error!(error = %err, "Unable to handle event");
            InvocationOutcome::Failed(err.to_string())
        }
    }
}

/// Runs one invocation from command-line arguments against the REST
/// backend and returns the process exit status.
pub async fn run(args: &Args) -> u8 {
    let config = match StorageAccountConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return EXIT_FAILURE;
        }
    };

    let backend = match RestBackend::new(&config, args.timeout_secs.map(Duration::from_secs)) {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            error!(error = %err, "Unable to create storage clients");
            return EXIT_FAILURE;
        }
    };
    let synchronizer = Synchronizer::new(config, backend);

    let outcome = match load_event(args.event.as_deref()).await {
        Ok(event) => run_invocation(&synchronizer, event.as_ref()).await,
        Err(err) => {
            error!(error = %err, "Unable to handle event");
            InvocationOutcome::Failed(err.to_string())
        }
    };

    outcome.exit_code(args.propagate_errors)
}

/// Reads the event JSON from `path`, or from stdin when no path is given.
pub async fn load_event(path: Option<&Path>) -> SyncResult<Option<SyncEvent>> {
    let payload = match path {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            SyncError::validation(format!("unable to read event file '{}': {}", path.display(), e))
        })?,
        None => {
            let mut payload = String::new();
            tokio::io::stdin()
                .read_to_string(&mut payload)
                .await
                .map_err(|e| SyncError::validation(format!("unable to read event from stdin: {}", e)))?;
            payload
        }
    };

    SyncEvent::from_json(&payload)
}
