//! Rust client for the Walrus content-addressed blob store
//!
//! Uploads JSON documents or binary blobs through the publisher, retrieves
//! them through the aggregator, and compresses images before upload.
//!
//! # Example
//!
//! ```rust,no_run
//! use walrus_storage_client::{BlobClient, CompressOptions, ImageFile, StorageConfig};
//!
//! # async fn example(avatar: ImageFile) -> Result<(), Box<dyn std::error::Error>> {
//! let client = BlobClient::new(StorageConfig::default())?;
//!
//! // Warn early if the store is down
//! let status = client.probe().await;
//! if !status.reachable {
//!     eprintln!("blob store unavailable: {:?}", status.error);
//! }
//!
//! // Image first, then the document that points at it
//! let avatar_id = client.upload_image(&avatar, &CompressOptions::default()).await?;
//! let profile_id = client
//!     .upload_json(&serde_json::json!({"username": "alice", "avatar_blob_id": avatar_id}))
//!     .await?;
//!
//! let profile = client.retrieve(profile_id.as_str()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod compress;
pub mod error;
pub mod extract;
pub mod mock;
pub mod retry;
pub mod transport;
pub mod types;

// Re-export main types
pub use client::BlobClient;
pub use compress::{compress_image, compress_with, CompressOptions, CompressedImage, ImageFile};
pub use error::{Result, StorageError};
pub use extract::{ExtractionChain, IdExtractor};
pub use mock::MemoryTransport;
pub use retry::{AttemptOutcome, RetryPolicy};
pub use transport::{BlobTransport, HttpTransport, RawResponse};
pub use types::*;
