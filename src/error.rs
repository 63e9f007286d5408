//! Error types for drivesync.

use thiserror::Error;

/// Common error type for drivesync.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (missing root folder id, credentials, ...).
    ///
    /// Fatal to the operation that hit it, never to the process.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An upload request arrived without a file payload.
    #[error("missing file")]
    MissingFile,

    /// Error reported by the remote storage service.
    #[error("remote storage error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        /// HTTP status returned by the service, if the request got that far.
        status: Option<u16>,
        /// Message from the service or the transport.
        message: String,
    },

    /// Credential provider error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Create a remote error without an HTTP status.
    pub fn remote(message: impl Into<String>) -> Self {
        SyncError::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::MissingFile)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Remote {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Result type alias for drivesync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
