//! Blob identifier extraction from publisher responses
//!
//! The publisher answers with one of several JSON shapes depending on
//! whether the blob was new or already stored. Each known shape is an
//! [`IdExtractor`]; an [`ExtractionChain`] tries them in order.

use crate::types::BlobId;
use serde_json::Value;

/// One response shape, addressed by a JSON pointer to the identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdExtractor {
    name: String,
    pointer: String,
}

impl IdExtractor {
    /// Strategy reading the string at `pointer` (RFC 6901 syntax).
    pub fn pointer(name: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pointer: pointer.into(),
        }
    }

    /// `{"newlyCreated": {"blobObject": {"blobId": "…"}}}`
    pub fn newly_created() -> Self {
        Self::pointer("newlyCreated", "/newlyCreated/blobObject/blobId")
    }

    /// `{"alreadyCertified": {"blobId": "…"}}`
    pub fn already_certified() -> Self {
        Self::pointer("alreadyCertified", "/alreadyCertified/blobId")
    }

    /// `{"blobId": "…"}`
    pub fn flat() -> Self {
        Self::pointer("flat", "/blobId")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier under this shape, if present and non-empty.
    pub fn extract(&self, response: &Value) -> Option<BlobId> {
        response
            .pointer(&self.pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(BlobId::from)
    }
}

/// Ordered list of extraction strategies; first hit wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionChain {
    extractors: Vec<IdExtractor>,
}

impl Default for ExtractionChain {
    fn default() -> Self {
        Self::new(vec![
            IdExtractor::newly_created(),
            IdExtractor::already_certified(),
            IdExtractor::flat(),
        ])
    }
}

impl ExtractionChain {
    pub fn new(extractors: Vec<IdExtractor>) -> Self {
        Self { extractors }
    }

    /// Append a strategy tried after the existing ones.
    pub fn with(mut self, extractor: IdExtractor) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// First identifier found, with the name of the shape that matched.
    pub fn extract(&self, response: &Value) -> Option<(&str, BlobId)> {
        self.extractors
            .iter()
            .find_map(|e| e.extract(response).map(|id| (e.name(), id)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(IdExtractor::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_newly_created_shape() {
        let response = json!({
            "newlyCreated": {
                "blobObject": {"id": "0xabc", "blobId": "M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk"},
                "cost": 132300
            }
        });
        let chain = ExtractionChain::default();
        let (shape, id) = chain.extract(&response).unwrap();
        assert_eq!(shape, "newlyCreated");
        assert_eq!(id.as_str(), "M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk");
    }

    #[test]
    fn test_already_certified_shape() {
        let response = json!({"alreadyCertified": {"blobId": "blob_7", "endEpoch": 120}});
        let chain = ExtractionChain::default();
        let (shape, id) = chain.extract(&response).unwrap();
        assert_eq!(shape, "alreadyCertified");
        assert_eq!(id, BlobId::from("blob_7"));
    }

    #[test]
    fn test_order_decides_between_shapes() {
        let response = json!({
            "blobId": "flat-id",
            "alreadyCertified": {"blobId": "certified-id"}
        });
        let chain = ExtractionChain::default();
        let (shape, id) = chain.extract(&response).unwrap();
        assert_eq!(shape, "alreadyCertified");
        assert_eq!(id.as_str(), "certified-id");
    }

    #[test]
    fn test_empty_or_non_string_ids_are_skipped() {
        let chain = ExtractionChain::default();
        assert!(chain.extract(&json!({"newlyCreated": {"blobObject": {"blobId": ""}}})).is_none());
        assert!(chain.extract(&json!({"blobId": 42})).is_none());
        assert!(chain.extract(&json!({"status": "ok"})).is_none());
    }

    #[test]
    fn test_custom_strategy() {
        let chain = ExtractionChain::default().with(IdExtractor::pointer("data", "/data/cid"));
        assert_eq!(chain.names(), vec!["newlyCreated", "alreadyCertified", "flat", "data"]);
        let (_, id) = chain.extract(&json!({"data": {"cid": "bafy"}})).unwrap();
        assert_eq!(id.as_str(), "bafy");
    }
}
