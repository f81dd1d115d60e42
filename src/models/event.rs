//! Storage event notifications.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Event type published when a blob is created or replaced.
pub const BLOB_CREATED_EVENT: &str = "Microsoft.Storage.BlobCreated";

/// Event type published when a blob is deleted.
pub const BLOB_DELETED_EVENT: &str = "Microsoft.Storage.BlobDeleted";

/// Kind of storage event. Anything unrecognised is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    BlobCreated,
    BlobDeleted,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::BlobCreated => BLOB_CREATED_EVENT,
            EventType::BlobDeleted => BLOB_DELETED_EVENT,
            EventType::Other(other) => other,
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            BLOB_CREATED_EVENT => EventType::BlobCreated,
            BLOB_DELETED_EVENT => EventType::BlobDeleted,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        EventType::from(s.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

/// Payload of a storage event; only the blob URL is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub url: String,
}

/// A single storage event as delivered to the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    pub data: EventData,
}

impl SyncEvent {
    pub fn new(event_type: impl Into<EventType>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            subject: None,
            event_type: event_type.into(),
            data: EventData { url: url.into() },
        }
    }

    pub fn source_url(&self) -> &str {
        &self.data.url
    }

    /// Parses an event payload. A JSON `null` yields `None`.
    pub fn from_json(payload: &str) -> SyncResult<Option<Self>> {
        serde_json::from_str(payload)
            .map_err(|e| SyncError::validation(format!("invalid event payload: {}", e)))
    }
}
