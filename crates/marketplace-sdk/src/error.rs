//! Error types for the marketplace SDK

use thiserror::Error;
use walrus_storage_client::StorageError;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types
#[derive(Error, Debug)]
pub enum SdkError {
    /// Blob storage failed (upload, fetch, compression)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wallet refused or failed to sign/execute
    #[error("Wallet error: {0}")]
    Signer(#[from] SignerError),

    /// Transaction executed but reported failure
    #[error("Transaction {digest} failed: {reason}")]
    Transaction { digest: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session used after it was closed, or not set up
    #[error("Session error: {0}")]
    Session(String),
}

/// Errors reported by the wallet collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// User dismissed the signing prompt
    #[error("Rejected by user")]
    Rejected,

    /// No wallet connected
    #[error("Wallet not connected")]
    NotConnected,

    /// Anything else the wallet reports
    #[error("{0}")]
    Other(String),
}
