//! Types for the blob storage client API

use crate::error::{Result, StorageError};
use crate::retry::RetryPolicy;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Walrus testnet publisher (write endpoint)
pub const DEFAULT_PUBLISHER_URL: &str = "https://publisher.walrus-testnet.walrus.space";
/// Walrus testnet aggregator (read endpoint)
pub const DEFAULT_AGGREGATOR_URL: &str = "https://aggregator.walrus-testnet.walrus.space";
/// Retention hint used when the caller does not pass one
pub const DEFAULT_EPOCHS: u32 = 100;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the publisher (uploads)
    pub publisher_url: String,
    /// Base URL of the aggregator (reads)
    pub aggregator_url: String,
    /// Optional bearer token sent with every request
    pub api_key: Option<String>,
    /// Retention hint applied when an upload does not set one (default: 100)
    pub default_epochs: u32,
    /// Upload timeout per attempt in seconds (default: 30)
    pub upload_timeout_secs: u64,
    /// Fetch timeout in seconds (default: 15)
    pub fetch_timeout_secs: u64,
    /// Total upload attempts, first one included (default: 3)
    pub max_attempts: u32,
    /// Base of the linear delay between upload attempts (default: 1500)
    pub retry_base_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            aggregator_url: DEFAULT_AGGREGATOR_URL.to_string(),
            api_key: None,
            default_epochs: DEFAULT_EPOCHS,
            upload_timeout_secs: 30,
            fetch_timeout_secs: 15,
            max_attempts: 3,
            retry_base_delay_ms: 1500,
        }
    }
}

impl StorageConfig {
    /// Config pointing both endpoints at one base URL (local stores, tests).
    pub fn single_endpoint(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            publisher_url: base_url.clone(),
            aggregator_url: base_url,
            ..Default::default()
        }
    }

    /// Load config from TOML text; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: StorageConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.publisher_url.trim().is_empty() {
            return Err(StorageError::Config("publisher_url is empty".into()));
        }
        if self.aggregator_url.trim().is_empty() {
            return Err(StorageError::Config("aggregator_url is empty".into()));
        }
        if self.max_attempts == 0 {
            return Err(StorageError::Config("max_attempts must be at least 1".into()));
        }
        if self.upload_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            return Err(StorageError::Config("timeouts must be non-zero".into()));
        }
        if self.default_epochs == 0 {
            return Err(StorageError::Config("default_epochs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Content identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for BlobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BlobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Data handed to an upload
#[derive(Debug, Clone)]
pub enum Payload {
    /// Already-encoded bytes, uploaded as-is
    Binary { data: Bytes, content_type: String },
    /// Structured document, serialized to JSON before upload
    Json(serde_json::Value),
}

impl Payload {
    /// Binary payload with an explicit media type.
    pub fn binary(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Payload::Binary {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    /// Structured payload from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Body bytes and content type as sent on the wire.
    ///
    /// `serde_json::Value` keeps object keys sorted, so equal documents
    /// always produce identical bytes.
    pub fn into_body(self) -> Result<(Bytes, String)> {
        match self {
            Payload::Binary { data, content_type } => Ok((data, content_type)),
            Payload::Json(value) => {
                let data = serde_json::to_vec(&value)?;
                Ok((Bytes::from(data), "application/json".to_string()))
            }
        }
    }
}

/// A single upload, consumed by [`BlobClient::upload`](crate::BlobClient::upload)
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Payload,
    /// Retention hint in epochs; `None` uses the configured default
    pub epochs: Option<u32>,
}

impl UploadRequest {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            epochs: None,
        }
    }

    pub fn with_epochs(mut self, epochs: u32) -> Self {
        self.epochs = Some(epochs);
        self
    }
}

/// Blob as returned by the retrieval operation
#[derive(Debug, Clone, PartialEq)]
pub enum BlobContent {
    /// Store declared a JSON content type; `raw` is the body as stored
    Json { value: serde_json::Value, raw: Bytes },
    /// Anything else, untouched
    Bytes {
        content_type: Option<String>,
        data: Bytes,
    },
}

impl BlobContent {
    /// Decode structured content into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            BlobContent::Json { value, .. } => Ok(serde_json::from_value(value)?),
            BlobContent::Bytes { content_type, .. } => Err(StorageError::MalformedResponse(
                format!(
                    "expected JSON content, got {}",
                    content_type.as_deref().unwrap_or("no content type")
                ),
            )),
        }
    }

    /// Body exactly as the store returned it.
    pub fn into_bytes(self) -> Bytes {
        match self {
            BlobContent::Json { raw, .. } => raw,
            BlobContent::Bytes { data, .. } => data,
        }
    }

    /// Parsed document, if the blob was JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            BlobContent::Json { value, .. } => Some(value),
            BlobContent::Bytes { .. } => None,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, BlobContent::Json { .. })
    }
}

/// Outcome of a connectivity probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<BlobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time of the probe upload, retries included
    pub elapsed_ms: u64,
}
