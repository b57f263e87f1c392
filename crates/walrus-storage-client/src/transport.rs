//! Wire access to the blob store
//!
//! A transport only moves bytes: it reports status, content type and body
//! and leaves classification (retry, identifier extraction, JSON vs raw)
//! to [`BlobClient`](crate::BlobClient).

use crate::error::{Result, StorageError};
use crate::types::StorageConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};

/// Raw response from the store
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text for error messages; falls back to the status reason.
    pub fn error_message(&self) -> String {
        let text = String::from_utf8_lossy(&self.body).trim().to_string();
        if !text.is_empty() {
            return text;
        }
        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("no response body")
            .to_string()
    }
}

/// Write/read access to a content-addressed store
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Submit a blob with its retention hint.
    async fn store(&self, body: Bytes, content_type: &str, epochs: u32) -> Result<RawResponse>;

    /// Read a blob by identifier.
    async fn read(&self, blob_id: &str) -> Result<RawResponse>;
}

/// HTTP transport for the Walrus publisher/aggregator API
///
/// Writes go to `PUT {publisher}/v1/store?epochs={n}`, reads to
/// `GET {aggregator}/v1/{blob_id}`. Deadlines are applied by the client,
/// not here.
pub struct HttpTransport {
    client: Client,
    publisher_url: String,
    aggregator_url: String,
}

impl HttpTransport {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| StorageError::Config("API key is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            publisher_url: config.publisher_url.trim_end_matches('/').to_string(),
            aggregator_url: config.aggregator_url.trim_end_matches('/').to_string(),
        })
    }

    fn store_url(&self, epochs: u32) -> String {
        format!("{}/v1/store?epochs={}", self.publisher_url, epochs)
    }

    fn read_url(&self, blob_id: &str) -> String {
        format!("{}/v1/{}", self.aggregator_url, urlencoding::encode(blob_id))
    }

    async fn into_raw(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl BlobTransport for HttpTransport {
    async fn store(&self, body: Bytes, content_type: &str, epochs: u32) -> Result<RawResponse> {
        let response = self
            .client
            .put(self.store_url(epochs))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        Self::into_raw(response).await
    }

    async fn read(&self, blob_id: &str) -> Result<RawResponse> {
        let response = self.client.get(self.read_url(blob_id)).send().await?;
        Self::into_raw(response).await
    }
}
