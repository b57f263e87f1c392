//! In-memory blob store for testing.

use crate::error::Result;
use crate::transport::{BlobTransport, RawResponse};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
    epochs: u32,
}

/// Content-addressed in-memory store speaking the publisher response shapes.
///
/// Identifiers are the URL-safe base64 SHA-256 of content type and body, so
/// distinct payloads never share an identifier and re-uploads answer with
/// the `alreadyCertified` shape. Failure injection covers transient
/// errors, malformed bodies and stores that never answer.
pub struct MemoryTransport {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    store_calls: AtomicU32,
    read_calls: AtomicU32,
    failures_remaining: AtomicU32,
    malformed: AtomicBool,
    hang: AtomicBool,
    hang_reads: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            store_calls: AtomicU32::new(0),
            read_calls: AtomicU32::new(0),
            failures_remaining: AtomicU32::new(0),
            malformed: AtomicBool::new(false),
            hang: AtomicBool::new(false),
            hang_reads: AtomicBool::new(false),
        }
    }

    /// Answer the next `n` stores with HTTP 503.
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Answer every store with HTTP 503.
    pub fn failing(self) -> Self {
        self.with_transient_failures(u32::MAX)
    }

    /// Answer stores with 200 and a body carrying no identifier.
    pub fn with_malformed_responses(self) -> Self {
        self.malformed.store(true, Ordering::SeqCst);
        self
    }

    /// Never complete stores.
    pub fn hanging(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    /// Never complete reads.
    pub fn hanging_reads(self) -> Self {
        self.hang_reads.store(true, Ordering::SeqCst);
        self
    }

    /// Number of store calls received.
    pub fn store_calls(&self) -> u32 {
        self.store_calls.load(Ordering::SeqCst)
    }

    /// Number of read calls received.
    pub fn read_calls(&self) -> u32 {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs held.
    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Retention hint a blob was stored with.
    pub async fn epochs_of(&self, blob_id: &str) -> Option<u32> {
        self.blobs.lock().await.get(blob_id).map(|b| b.epochs)
    }

    fn blob_id_for(content_type: &str, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content_type.as_bytes());
        hasher.update([0u8]);
        hasher.update(data);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn json_response(status: u16, value: serde_json::Value) -> RawResponse {
        RawResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    fn text_response(status: u16, text: &str) -> RawResponse {
        RawResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from(text.to_string()),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobTransport for MemoryTransport {
    async fn store(&self, body: Bytes, content_type: &str, epochs: u32) -> Result<RawResponse> {
        let call = self.store_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Ok(Self::text_response(
                503,
                &format!("store unavailable (call {})", call),
            ));
        }

        if self.malformed.load(Ordering::SeqCst) {
            return Ok(Self::json_response(200, serde_json::json!({"status": "stored"})));
        }

        let blob_id = Self::blob_id_for(content_type, &body);
        let mut blobs = self.blobs.lock().await;
        let response = if blobs.contains_key(&blob_id) {
            serde_json::json!({
                "alreadyCertified": {"blobId": blob_id, "endEpoch": epochs}
            })
        } else {
            blobs.insert(
                blob_id.clone(),
                StoredBlob {
                    content_type: content_type.to_string(),
                    data: body,
                    epochs,
                },
            );
            serde_json::json!({
                "newlyCreated": {"blobObject": {"blobId": blob_id, "storage": {"endEpoch": epochs}}}
            })
        };

        Ok(Self::json_response(200, response))
    }

    async fn read(&self, blob_id: &str) -> Result<RawResponse> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        if self.hang_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        match self.blobs.lock().await.get(blob_id) {
            Some(blob) => Ok(RawResponse {
                status: 200,
                content_type: Some(blob.content_type.clone()),
                body: blob.data.clone(),
            }),
            None => Ok(Self::text_response(404, "blob not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identifiers_follow_content() {
        let store = MemoryTransport::new();

        let a = store.store(Bytes::from_static(b"one"), "text/plain", 1).await.unwrap();
        let b = store.store(Bytes::from_static(b"two"), "text/plain", 1).await.unwrap();
        let again = store.store(Bytes::from_static(b"one"), "text/plain", 1).await.unwrap();

        let a: serde_json::Value = serde_json::from_slice(&a.body).unwrap();
        let b: serde_json::Value = serde_json::from_slice(&b.body).unwrap();
        let again: serde_json::Value = serde_json::from_slice(&again.body).unwrap();

        let id_a = &a["newlyCreated"]["blobObject"]["blobId"];
        assert_ne!(id_a, &b["newlyCreated"]["blobObject"]["blobId"]);
        assert_eq!(id_a, &again["alreadyCertified"]["blobId"]);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.store_calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_failures_run_out() {
        let store = MemoryTransport::new().with_transient_failures(1);
        let first = store.store(Bytes::from_static(b"x"), "text/plain", 1).await.unwrap();
        let second = store.store(Bytes::from_static(b"x"), "text/plain", 1).await.unwrap();
        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
    }

    #[tokio::test]
    async fn test_read_missing_blob() {
        let store = MemoryTransport::new();
        let response = store.read("nope").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(store.read_calls(), 1);
    }
}
