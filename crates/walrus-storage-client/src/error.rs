//! Error types for the blob storage client

use std::time::Duration;
use thiserror::Error;

/// Blob storage client error
///
/// Messages are kept stable: callers match on substrings (for example
/// `"network is unstable"` or `"attempts"`) to pick user-facing guidance.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Input rejected before any I/O
    #[error("validation failed: {0}")]
    Validation(String),

    /// Request did not complete within its deadline
    #[error(
        "{operation} timed out after {}s: blob store is likely unavailable or the network is unstable",
        .after.as_secs_f64()
    )]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Transport-level failure (connect, TLS, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Store answered with a non-success status
    #[error("blob store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Successful status but the body could not be interpreted
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Upload retry budget used up
    #[error("upload failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<StorageError>,
    },

    /// Retrieval failed
    #[error("fetch of {blob_id} failed: {source}")]
    Fetch {
        blob_id: String,
        source: Box<StorageError>,
    },

    /// Image bytes could not be decoded
    #[error("failed to load image: {0}")]
    ImageDecode(String),

    /// Image could not be re-encoded
    #[error("failed to compress image: {0}")]
    ImageEncode(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether the upload path should spend another attempt on this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Timeout { .. }
                | StorageError::Network(_)
                | StorageError::Status { .. }
                | StorageError::MalformedResponse(_)
        )
    }

    /// Whether this error, or the last attempt behind it, was a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            StorageError::Timeout { .. } => true,
            StorageError::Exhausted { last, .. } => last.is_timeout(),
            StorageError::Fetch { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Status { status, .. } => Some(*status),
            StorageError::Exhausted { last, .. } => last.status(),
            StorageError::Fetch { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(e: toml::de::Error) -> Self {
        StorageError::Config(e.to_string())
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
