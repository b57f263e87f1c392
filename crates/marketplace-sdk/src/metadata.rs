//! Metadata documents stored as blobs, and the caller inputs they are
//! built from.

use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use walrus_storage_client::BlobId;

/// Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SdkError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

// ============================================================================
// Profiles
// ============================================================================

/// Profile fields supplied by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<()> {
        require("username", &self.username)
    }
}

/// Profile document as stored in Walrus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_blob_id: Option<BlobId>,
    pub created_at: i64,
}

impl ProfileMetadata {
    pub fn new(input: ProfileInput, avatar_blob_id: Option<BlobId>) -> Self {
        Self {
            username: input.username.trim().to_string(),
            bio: input.bio,
            skills: input.skills,
            avatar_blob_id,
            created_at: now_millis(),
        }
    }
}

/// Profile read back from storage, with a resolved avatar link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub metadata: ProfileMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

// ============================================================================
// Listings
// ============================================================================

/// Service listing fields supplied by the seller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Price in SUI
    pub price: f64,
}

impl ListingInput {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(SdkError::InvalidInput(format!(
                "price must be a positive amount of SUI, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_blob_ids: Vec<BlobId>,
    pub created_at: i64,
}

impl ListingMetadata {
    pub const DEFAULT_CATEGORY: &'static str = "Other";

    pub fn new(input: &ListingInput, image_blob_ids: Vec<BlobId>) -> Self {
        let category = input
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Self::DEFAULT_CATEGORY)
            .to_string();
        Self {
            title: input.title.clone(),
            description: input.description.clone(),
            category,
            image_blob_ids,
            created_at: now_millis(),
        }
    }
}

// ============================================================================
// NFTs
// ============================================================================

/// Trait of an NFT, e.g. `{"trait_type": "rarity", "value": "gold"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NftInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<NftAttribute>,
}

impl NftInput {
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    /// Direct aggregator URL of the image
    pub image: String,
    pub image_blob_id: BlobId,
    pub attributes: Vec<NftAttribute>,
    pub created_at: i64,
}

// ============================================================================
// Governance
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalInput {
    pub title: String,
    pub description: String,
    /// Voting window in epochs; 7 when unset
    #[serde(default)]
    pub voting_duration: Option<u64>,
}

impl ProposalInput {
    pub const DEFAULT_VOTING_EPOCHS: u64 = 7;

    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        if self.voting_duration == Some(0) {
            return Err(SdkError::InvalidInput("voting duration must be at least one epoch".into()));
        }
        Ok(())
    }

    pub fn voting_epochs(&self) -> u64 {
        self.voting_duration.unwrap_or(Self::DEFAULT_VOTING_EPOCHS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub title: String,
    pub description: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_category_defaults_to_other() {
        let input = ListingInput {
            title: "Logo design".into(),
            description: "Three concepts".into(),
            category: Some("  ".into()),
            price: 2.0,
        };
        let metadata = ListingMetadata::new(&input, vec![]);
        assert_eq!(metadata.category, "Other");
    }

    #[test]
    fn test_listing_price_must_be_positive() {
        let mut input = ListingInput {
            title: "Audit".into(),
            price: 0.0,
            ..Default::default()
        };
        assert!(input.validate().is_err());
        input.price = f64::NAN;
        assert!(input.validate().is_err());
        input.price = 0.25;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_profile_metadata_skips_missing_avatar() {
        let metadata = ProfileMetadata::new(
            ProfileInput {
                username: " alice ".into(),
                ..Default::default()
            },
            None,
        );
        assert_eq!(metadata.username, "alice");
        let value = serde_json::to_value(&metadata).unwrap();
        assert!(value.get("avatar_blob_id").is_none());
    }

    #[test]
    fn test_proposal_voting_default() {
        let input = ProposalInput {
            title: "Lower fees".into(),
            ..Default::default()
        };
        assert_eq!(input.voting_epochs(), 7);
        let zero = ProposalInput {
            voting_duration: Some(0),
            ..input
        };
        assert!(zero.validate().is_err());
    }
}
