//! Error types for the synchronizer and the storage services it talks to.

use thiserror::Error;

/// Azure Storage error codes the synchronizer can encounter.
///
/// Codes arrive in the `x-ms-error-code` response header or in the `<Code>`
/// element of an XML error body. `TransportFailure` is local and never sent
/// by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // General errors
    AuthenticationFailed,
    AuthorizationFailure,
    AuthorizationPermissionMismatch,
    InsufficientAccountPermissions,
    InternalError,
    InvalidAuthenticationInfo,
    InvalidHeaderValue,
    InvalidInput,
    InvalidRange,
    InvalidResourceName,
    InvalidUri,
    Md5Mismatch,
    OperationTimedOut,
    RequestBodyTooLarge,
    ResourceAlreadyExists,
    ResourceNotFound,
    ServerBusy,

    // Blob service
    BlobNotFound,
    ContainerNotFound,

    // File service
    ParentNotFound,
    ShareNotFound,
    SharingViolation,

    // Client side
    TransportFailure,
    Unrecognized,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "AuthenticationFailed",
            ErrorCode::AuthorizationFailure => "AuthorizationFailure",
            ErrorCode::AuthorizationPermissionMismatch => "AuthorizationPermissionMismatch",
            ErrorCode::InsufficientAccountPermissions => "InsufficientAccountPermissions",
            ErrorCode::InternalError => "InternalError",
            ErrorCode::InvalidAuthenticationInfo => "InvalidAuthenticationInfo",
            ErrorCode::InvalidHeaderValue => "InvalidHeaderValue",
            ErrorCode::InvalidInput => "InvalidInput",
            ErrorCode::InvalidRange => "InvalidRange",
            ErrorCode::InvalidResourceName => "InvalidResourceName",
            ErrorCode::InvalidUri => "InvalidUri",
            ErrorCode::Md5Mismatch => "Md5Mismatch",
            ErrorCode::OperationTimedOut => "OperationTimedOut",
            ErrorCode::RequestBodyTooLarge => "RequestBodyTooLarge",
            ErrorCode::ResourceAlreadyExists => "ResourceAlreadyExists",
            ErrorCode::ResourceNotFound => "ResourceNotFound",
            ErrorCode::ServerBusy => "ServerBusy",
            ErrorCode::BlobNotFound => "BlobNotFound",
            ErrorCode::ContainerNotFound => "ContainerNotFound",
            ErrorCode::ParentNotFound => "ParentNotFound",
            ErrorCode::ShareNotFound => "ShareNotFound",
            ErrorCode::SharingViolation => "SharingViolation",
            ErrorCode::TransportFailure => "TransportFailure",
            ErrorCode::Unrecognized => "Unrecognized",
        }
    }

    /// Parses a service error code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = match code {
            "AuthenticationFailed" => ErrorCode::AuthenticationFailed,
            "AuthorizationFailure" => ErrorCode::AuthorizationFailure,
            "AuthorizationPermissionMismatch" => ErrorCode::AuthorizationPermissionMismatch,
            "InsufficientAccountPermissions" => ErrorCode::InsufficientAccountPermissions,
            "InternalError" => ErrorCode::InternalError,
            "InvalidAuthenticationInfo" => ErrorCode::InvalidAuthenticationInfo,
            "InvalidHeaderValue" => ErrorCode::InvalidHeaderValue,
            "InvalidInput" => ErrorCode::InvalidInput,
            "InvalidRange" => ErrorCode::InvalidRange,
            "InvalidResourceName" => ErrorCode::InvalidResourceName,
            "InvalidUri" => ErrorCode::InvalidUri,
            "Md5Mismatch" => ErrorCode::Md5Mismatch,
            "OperationTimedOut" => ErrorCode::OperationTimedOut,
            "RequestBodyTooLarge" => ErrorCode::RequestBodyTooLarge,
            "ResourceAlreadyExists" => ErrorCode::ResourceAlreadyExists,
            "ResourceNotFound" => ErrorCode::ResourceNotFound,
            "ServerBusy" => ErrorCode::ServerBusy,
            "BlobNotFound" => ErrorCode::BlobNotFound,
            "ContainerNotFound" => ErrorCode::ContainerNotFound,
            "ParentNotFound" => ErrorCode::ParentNotFound,
            "ShareNotFound" => ErrorCode::ShareNotFound,
            "SharingViolation" => ErrorCode::SharingViolation,
            _ => return None,
        };
        Some(code)
    }

    /// Best-effort code for a response that carried no error code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::AuthenticationFailed,
            403 => ErrorCode::AuthorizationFailure,
            404 => ErrorCode::ResourceNotFound,
            409 => ErrorCode::ResourceAlreadyExists,
            413 => ErrorCode::RequestBodyTooLarge,
            416 => ErrorCode::InvalidRange,
            500 => ErrorCode::InternalError,
            503 => ErrorCode::ServerBusy,
            _ => ErrorCode::Unrecognized,
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => {
                "Server failed to authenticate the request. Make sure the account key is correct."
            }
            ErrorCode::AuthorizationFailure => {
                "This request is not authorized to perform this operation."
            }
            ErrorCode::BlobNotFound => "The specified blob does not exist.",
            ErrorCode::ContainerNotFound => "The specified container does not exist.",
            ErrorCode::InvalidRange => "The range specified is invalid for the current size of the resource.",
            ErrorCode::InvalidUri => "The requested URI does not represent any resource on the server.",
            ErrorCode::Md5Mismatch => "The MD5 value of the content does not match the computed value.",
            ErrorCode::ParentNotFound => "The specified parent path does not exist.",
            ErrorCode::ResourceAlreadyExists => "The specified resource already exists.",
            ErrorCode::ResourceNotFound => "The specified resource does not exist.",
            ErrorCode::ShareNotFound => "The specified share does not exist.",
            ErrorCode::TransportFailure => "The request could not be delivered to the storage service.",
            _ => "An error occurred while processing the request.",
        }
    }
}

/// Storage error with code and message.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct StorageError {
    pub code: ErrorCode,
    pub message: String,
    /// HTTP status of the failed response, when there was one.
    pub status: Option<u16>,
    pub request_id: Option<String>,
}

impl StorageError {
    /// Creates a new storage error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            status: None,
            request_id: None,
        }
    }

    /// Creates a new storage error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            request_id: None,
        }
    }

    /// Sets the HTTP status for this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the request ID for this error.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns true if the resource itself (not its parent) is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self.code, ErrorCode::ResourceNotFound | ErrorCode::BlobNotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        self.code == ErrorCode::ResourceAlreadyExists
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::OperationTimedOut
        } else {
            ErrorCode::TransportFailure
        };
        let mut error = StorageError::with_message(code, err.to_string());
        error.status = err.status().map(|s| s.as_u16());
        error
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that end a synchronizer invocation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing event or unusable configuration.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Malformed URL, host or path.
    #[error("parse failed: {0}")]
    Parse(String),

    /// A storage collaborator failed; passed through unchanged.
    #[error("storage operation failed: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        SyncError::Parse(message.into())
    }
}

/// Result type alias for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;
