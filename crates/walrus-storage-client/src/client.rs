//! Blob storage client: upload with retry, retrieval, probe

use crate::compress::{compress_with, CompressOptions, ImageFile};
use crate::error::{Result, StorageError};
use crate::extract::ExtractionChain;
use crate::retry::RetryPolicy;
use crate::transport::{BlobTransport, HttpTransport};
use crate::types::*;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Client for a content-addressed blob store
///
/// # Example
///
/// ```rust,no_run
/// use walrus_storage_client::{BlobClient, StorageConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BlobClient::new(StorageConfig::default())?;
///
/// let id = client
///     .upload_json(&serde_json::json!({"username": "alice", "skills": ["rust", "go"]}))
///     .await?;
/// let profile: serde_json::Value = client.retrieve_json(id.as_str()).await?;
/// # Ok(())
/// # }
/// ```
pub struct BlobClient<T = HttpTransport> {
    transport: T,
    config: StorageConfig,
    retry: RetryPolicy,
    extractors: ExtractionChain,
}

impl BlobClient<HttpTransport> {
    /// Create a client talking HTTP to the configured publisher/aggregator.
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(transport, config)
    }
}

impl<T: BlobTransport> BlobClient<T> {
    /// Create a client over any transport. The config is validated the
    /// same way as in [`BlobClient::new`].
    pub fn with_transport(transport: T, config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let retry = config.retry_policy();
        Ok(Self {
            transport,
            config,
            retry,
            extractors: ExtractionChain::default(),
        })
    }

    /// Replace the response-shape strategies.
    pub fn with_extractors(mut self, extractors: ExtractionChain) -> Self {
        self.extractors = extractors;
        self
    }

    /// Replace the retry budget from the config.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Aggregator URL serving a blob directly (image links, downloads).
    pub fn blob_url(&self, blob_id: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.aggregator_url.trim_end_matches('/'),
            urlencoding::encode(blob_id)
        )
    }

    // ==================== Upload ====================

    /// Upload a payload and return its identifier.
    ///
    /// Transient failures (network, non-success status, unusable body,
    /// timeout) are retried with linear backoff. When the budget runs out
    /// the error is [`StorageError::Exhausted`] wrapping the last failure.
    pub async fn upload(&self, request: UploadRequest) -> Result<BlobId> {
        self.upload_with(request, &self.retry).await
    }

    async fn upload_with(&self, request: UploadRequest, retry: &RetryPolicy) -> Result<BlobId> {
        let UploadRequest { payload, epochs } = request;
        let epochs = epochs.unwrap_or(self.config.default_epochs);
        if epochs == 0 {
            return Err(StorageError::Validation(
                "retention must be at least one epoch".into(),
            ));
        }

        let (body, content_type) = payload.into_body()?;
        let size = body.len();
        let timeout = self.config.upload_timeout();
        let transport = &self.transport;
        let extractors = &self.extractors;
        let content_type = content_type.as_str();

        let blob_id = retry
            .run("upload", |attempt| {
                let body = body.clone();
                async move {
                    debug!(attempt, size, epochs, content_type, "Uploading blob");

                    let response =
                        match tokio::time::timeout(timeout, transport.store(body, content_type, epochs)).await {
                            Ok(result) => result?,
                            Err(_) => {
                                return Err(StorageError::Timeout {
                                    operation: "upload",
                                    after: timeout,
                                })
                            }
                        };

                    if !response.is_success() {
                        return Err(StorageError::Status {
                            status: response.status,
                            message: response.error_message(),
                        });
                    }

                    let value: serde_json::Value = serde_json::from_slice(&response.body)
                        .map_err(|e| StorageError::MalformedResponse(format!("body is not JSON: {}", e)))?;

                    let (shape, blob_id) = extractors.extract(&value).ok_or_else(|| {
                        StorageError::MalformedResponse(format!(
                            "no blob identifier in response (tried {})",
                            extractors.names().join(", ")
                        ))
                    })?;

                    debug!(blob_id = %blob_id, shape, "Blob stored");
                    Ok(blob_id)
                }
            })
            .await?;

        info!(blob_id = %blob_id, size, epochs, "Uploaded blob");
        Ok(blob_id)
    }

    /// Upload any serializable value as JSON with the default retention.
    pub async fn upload_json<V: Serialize + ?Sized>(&self, value: &V) -> Result<BlobId> {
        self.upload(UploadRequest::new(Payload::json(value)?)).await
    }

    /// Upload raw bytes with the default retention.
    pub async fn upload_bytes(&self, data: impl Into<Bytes>, content_type: &str) -> Result<BlobId> {
        self.upload(UploadRequest::new(Payload::binary(data, content_type))).await
    }

    /// Compress an image, then upload the result.
    ///
    /// A rejected or undecodable image fails before any network call.
    pub async fn upload_image(&self, file: &ImageFile, options: &CompressOptions) -> Result<BlobId> {
        let compressed = compress_with(file, options)?;
        self.upload(UploadRequest::new(compressed.into_payload())).await
    }

    // ==================== Retrieval ====================

    /// Fetch a blob. JSON content types are parsed, anything else is
    /// returned as bytes. No retry.
    pub async fn retrieve(&self, blob_id: &str) -> Result<BlobContent> {
        let blob_id = blob_id.trim();
        if blob_id.is_empty() {
            return Err(StorageError::Validation("blob identifier is empty".into()));
        }

        let timeout = self.config.fetch_timeout();
        let fetch_error = |source: StorageError| StorageError::Fetch {
            blob_id: blob_id.to_string(),
            source: Box::new(source),
        };

        let response = match tokio::time::timeout(timeout, self.transport.read(blob_id)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(fetch_error(e)),
            Err(_) => {
                return Err(fetch_error(StorageError::Timeout {
                    operation: "fetch",
                    after: timeout,
                }))
            }
        };

        if !response.is_success() {
            warn!(blob_id, status = response.status, "Blob fetch failed");
            return Err(fetch_error(StorageError::Status {
                status: response.status,
                message: response.error_message(),
            }));
        }

        let is_json = response
            .content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        debug!(blob_id, size = response.body.len(), is_json, "Fetched blob");

        if is_json {
            let value = serde_json::from_slice(&response.body).map_err(|e| {
                StorageError::MalformedResponse(format!(
                    "blob {} declared JSON but did not parse: {}",
                    blob_id, e
                ))
            })?;
            return Ok(BlobContent::Json {
                value,
                raw: response.body,
            });
        }

        Ok(BlobContent::Bytes {
            content_type: response.content_type,
            data: response.body,
        })
    }

    /// Fetch a blob and decode it as `V`.
    pub async fn retrieve_json<V: DeserializeOwned>(&self, blob_id: &str) -> Result<V> {
        self.retrieve(blob_id).await?.into_json()
    }

    // ==================== Probe ====================

    /// Check the store accepts writes by uploading a tiny document.
    ///
    /// Single attempt with the upload deadline, no retry. Never fails;
    /// problems are reported in the returned status.
    pub async fn probe(&self) -> ProbeStatus {
        let started = Instant::now();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let request = Payload::json(&serde_json::json!({"probe": true, "timestamp": timestamp}))
            .map(|payload| UploadRequest::new(payload).with_epochs(1));
        let result = match request {
            Ok(request) => self.upload_with(request, &RetryPolicy::none()).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(blob_id) => {
                info!(blob_id = %blob_id, elapsed_ms, "Blob store reachable");
                ProbeStatus {
                    reachable: true,
                    blob_id: Some(blob_id),
                    error: None,
                    elapsed_ms,
                }
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "Blob store unreachable");
                ProbeStatus {
                    reachable: false,
                    blob_id: None,
                    error: Some(e.to_string()),
                    elapsed_ms,
                }
            }
        }
    }
}
