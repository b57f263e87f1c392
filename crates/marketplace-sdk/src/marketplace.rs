//! Publish flows: images → metadata → wallet
//!
//! Every flow validates its input first, then runs strictly in order:
//! compress and upload images, upload the metadata document that embeds
//! their identifiers, and only then hand the metadata identifier to the
//! wallet. The first failure aborts the rest of the flow, so nothing is
//! signed for a profile or listing whose blobs did not all make it.
//!
//! Purchases and votes reference existing on-chain objects and go straight
//! to the wallet.

use crate::error::{Result, SdkError};
use crate::metadata::*;
use crate::units::sui_to_mist;
use crate::wallet::{CallArg, TransactionPayload, TxOutcome, TxStatus, WalletSigner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walrus_storage_client::{
    BlobClient, BlobId, BlobTransport, CompressOptions, HttpTransport, ImageFile,
};

/// Package of the deployed marketplace contracts (testnet)
pub const DEFAULT_PACKAGE_ID: &str =
    "0xddda65f9f32984409cb14bb6ae3beda6c8d7d8b13a5300f388edac19c729b909";

/// Max width for avatars and listing images
pub const STANDARD_IMAGE_WIDTH: u32 = 800;
/// Max width for NFT artwork
pub const NFT_IMAGE_WIDTH: u32 = 1200;

/// Contract modules in the marketplace package
pub mod modules {
    pub const USER_PROFILE: &str = "user_profile";
    pub const LISTINGS: &str = "listings";
    pub const NFT: &str = "nft";
    pub const GOVERNANCE: &str = "governance";
}

/// Result of a publish flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    /// Metadata document referenced by the transaction
    pub metadata_blob_id: BlobId,
    pub outcome: TxOutcome,
}

/// Marketplace flows over a blob client and a wallet
pub struct Marketplace<S, T = HttpTransport> {
    storage: Arc<BlobClient<T>>,
    signer: S,
    package_id: String,
}

impl<S: WalletSigner, T: BlobTransport> Marketplace<S, T> {
    pub fn new(storage: Arc<BlobClient<T>>, signer: S) -> Self {
        Self {
            storage,
            signer,
            package_id: DEFAULT_PACKAGE_ID.to_string(),
        }
    }

    /// Target another deployment of the contracts.
    pub fn with_package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = package_id.into();
        self
    }

    pub fn storage(&self) -> &BlobClient<T> {
        &self.storage
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    // ==================== Profiles ====================

    /// Upload avatar and profile document, then call `create_profile`.
    pub async fn create_profile(&self, input: ProfileInput, avatar: Option<&ImageFile>) -> Result<Published> {
        input.validate()?;
        let metadata_blob_id = self.upload_profile(input, avatar).await?;

        self.execute(
            modules::USER_PROFILE,
            "create_profile",
            vec![CallArg::String(metadata_blob_id.to_string())],
            metadata_blob_id,
        )
        .await
    }

    /// Upload a new profile document and point the profile object at it.
    pub async fn update_profile(
        &self,
        profile_object_id: &str,
        input: ProfileInput,
        avatar: Option<&ImageFile>,
    ) -> Result<Published> {
        if profile_object_id.trim().is_empty() {
            return Err(SdkError::InvalidInput("profile object id is required".into()));
        }
        input.validate()?;
        let metadata_blob_id = self.upload_profile(input, avatar).await?;

        self.execute(
            modules::USER_PROFILE,
            "update_profile",
            vec![
                CallArg::Object(profile_object_id.to_string()),
                CallArg::String(metadata_blob_id.to_string()),
            ],
            metadata_blob_id,
        )
        .await
    }

    /// Fetch a profile document and resolve its avatar link.
    pub async fn load_profile(&self, metadata_blob_id: &str) -> Result<ProfileView> {
        let metadata: ProfileMetadata = self.storage.retrieve_json(metadata_blob_id).await?;
        let avatar_url = metadata
            .avatar_blob_id
            .as_ref()
            .map(|id| self.storage.blob_url(id.as_str()));

        Ok(ProfileView { metadata, avatar_url })
    }

    async fn upload_profile(&self, input: ProfileInput, avatar: Option<&ImageFile>) -> Result<BlobId> {
        let avatar_blob_id = match avatar {
            Some(file) => Some(self.upload_image(file, STANDARD_IMAGE_WIDTH).await?),
            None => None,
        };

        let metadata = ProfileMetadata::new(input, avatar_blob_id);
        let id = self.storage.upload_json(&metadata).await?;
        debug!(blob_id = %id, username = %metadata.username, "Uploaded profile metadata");
        Ok(id)
    }

    // ==================== Listings ====================

    /// Upload listing images and document, then call `create_listing` with
    /// the price in MIST.
    pub async fn create_listing(&self, input: ListingInput, images: &[ImageFile]) -> Result<Published> {
        input.validate()?;

        let mut image_blob_ids = Vec::with_capacity(images.len());
        for image in images {
            image_blob_ids.push(self.upload_image(image, STANDARD_IMAGE_WIDTH).await?);
        }

        let metadata = ListingMetadata::new(&input, image_blob_ids);
        let metadata_blob_id = self.storage.upload_json(&metadata).await?;
        let price_in_mist = sui_to_mist(input.price);

        self.execute(
            modules::LISTINGS,
            "create_listing",
            vec![
                CallArg::String(metadata_blob_id.to_string()),
                CallArg::U64(price_in_mist),
            ],
            metadata_blob_id,
        )
        .await
    }

    /// Pay for a listing with a coin of `price` SUI split from gas.
    pub async fn purchase_service(&self, listing_object_id: &str, price: f64) -> Result<TxOutcome> {
        if listing_object_id.trim().is_empty() {
            return Err(SdkError::InvalidInput("listing object id is required".into()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(SdkError::InvalidInput(format!(
                "price must be a positive amount of SUI, got {}",
                price
            )));
        }

        let price_in_mist = sui_to_mist(price);
        let outcome = self
            .sign(
                modules::LISTINGS,
                "purchase_service",
                vec![
                    CallArg::Object(listing_object_id.to_string()),
                    CallArg::GasCoin(price_in_mist),
                ],
            )
            .await?;
        info!(digest = %outcome.digest, listing = listing_object_id, price_in_mist, "Service purchased");
        Ok(outcome)
    }

    // ==================== NFTs ====================

    /// Upload artwork (1200px) and metadata, then call `mint_nft`.
    pub async fn mint_nft(&self, input: NftInput, image: &ImageFile) -> Result<Published> {
        input.validate()?;

        let image_blob_id = self.upload_image(image, NFT_IMAGE_WIDTH).await?;
        let metadata = NftMetadata {
            name: input.name.clone(),
            description: input.description,
            image: self.storage.blob_url(image_blob_id.as_str()),
            image_blob_id,
            attributes: input.attributes,
            created_at: now_millis(),
        };
        let metadata_blob_id = self.storage.upload_json(&metadata).await?;

        self.execute(
            modules::NFT,
            "mint_nft",
            vec![
                CallArg::String(input.name),
                CallArg::String(metadata_blob_id.to_string()),
            ],
            metadata_blob_id,
        )
        .await
    }

    // ==================== Governance ====================

    /// Upload the proposal text, then call `create_proposal`.
    pub async fn create_proposal(&self, input: ProposalInput) -> Result<Published> {
        input.validate()?;

        let metadata = ProposalMetadata {
            title: input.title.clone(),
            description: input.description.clone(),
            created_at: now_millis(),
        };
        let metadata_blob_id = self.storage.upload_json(&metadata).await?;

        self.execute(
            modules::GOVERNANCE,
            "create_proposal",
            vec![
                CallArg::String(input.title.clone()),
                CallArg::String(metadata_blob_id.to_string()),
                CallArg::U64(input.voting_epochs()),
            ],
            metadata_blob_id,
        )
        .await
    }

    /// Cast a yes (`true`) or no vote on a proposal.
    pub async fn vote_on_proposal(&self, proposal_object_id: &str, vote_for: bool) -> Result<TxOutcome> {
        if proposal_object_id.trim().is_empty() {
            return Err(SdkError::InvalidInput("proposal object id is required".into()));
        }

        let outcome = self
            .sign(
                modules::GOVERNANCE,
                "vote",
                vec![
                    CallArg::Object(proposal_object_id.to_string()),
                    CallArg::Bool(vote_for),
                ],
            )
            .await?;
        info!(digest = %outcome.digest, proposal = proposal_object_id, vote_for, "Vote cast");
        Ok(outcome)
    }

    // ==================== Helpers ====================

    async fn upload_image(&self, file: &ImageFile, max_width: u32) -> Result<BlobId> {
        let options = CompressOptions::default().with_max_width(max_width);
        let id = self.storage.upload_image(file, &options).await?;
        debug!(blob_id = %id, name = %file.name, max_width, "Uploaded image");
        Ok(id)
    }

    async fn execute(
        &self,
        module: &str,
        function: &str,
        arguments: Vec<CallArg>,
        metadata_blob_id: BlobId,
    ) -> Result<Published> {
        let outcome = self.sign(module, function, arguments).await?;
        info!(
            digest = %outcome.digest,
            module,
            function,
            metadata_blob_id = %metadata_blob_id,
            "Transaction executed"
        );
        Ok(Published {
            metadata_blob_id,
            outcome,
        })
    }

    async fn sign(&self, module: &str, function: &str, arguments: Vec<CallArg>) -> Result<TxOutcome> {
        let payload = TransactionPayload::move_call(&self.package_id, module, function, arguments);
        let outcome = self.signer.sign_and_execute(payload).await?;

        if let TxStatus::Failure(ref reason) = outcome.status {
            warn!(digest = %outcome.digest, module, function, reason = %reason, "Transaction failed");
            return Err(SdkError::Transaction {
                digest: outcome.digest.clone(),
                reason: reason.clone(),
            });
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignerError;
    use crate::wallet::MockSigner;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use walrus_storage_client::{MemoryTransport, StorageConfig, StorageError};

    fn marketplace(transport: MemoryTransport, signer: MockSigner) -> Marketplace<MockSigner, MemoryTransport> {
        let storage = BlobClient::with_transport(transport, StorageConfig::default()).unwrap();
        Marketplace::new(Arc::new(storage), signer)
    }

    fn png(width: u32, height: u32) -> ImageFile {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        ImageFile::new("image.png", "image/png", out.into_inner())
    }

    fn alice() -> ProfileInput {
        ProfileInput {
            username: "alice".into(),
            bio: "Rust freelancer".into(),
            skills: vec!["rust".into(), "go".into()],
        }
    }

    #[tokio::test]
    async fn test_create_profile_chains_avatar_metadata_and_wallet() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());

        let published = market
            .create_profile(alice(), Some(&png(1024, 768)))
            .await
            .unwrap();

        // avatar + metadata
        assert_eq!(market.storage().transport().store_calls(), 2);

        let calls = market.signer().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function(), Some(("user_profile", "create_profile")));
        assert_eq!(
            calls[0].arguments,
            vec![CallArg::String(published.metadata_blob_id.to_string())]
        );

        let view = market
            .load_profile(published.metadata_blob_id.as_str())
            .await
            .unwrap();
        assert_eq!(view.metadata.username, "alice");
        assert_eq!(view.metadata.skills, vec!["rust", "go"]);
        let avatar_id = view.metadata.avatar_blob_id.unwrap();
        assert_eq!(
            view.avatar_url.unwrap(),
            format!("{}/v1/{}", walrus_storage_client::DEFAULT_AGGREGATOR_URL, avatar_id)
        );
    }

    #[tokio::test]
    async fn test_invalid_avatar_aborts_before_any_upload() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        let not_an_image = ImageFile::new("resume.pdf", "application/pdf", &b"%PDF"[..]);

        let err = market
            .create_profile(alice(), Some(&not_an_image))
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Storage(StorageError::Validation(_))));
        assert_eq!(market.storage().transport().store_calls(), 0);
        assert_eq!(market.signer().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_never_reaches_wallet() {
        let market = marketplace(MemoryTransport::new().failing(), MockSigner::new());

        let err = market
            .create_profile(alice(), Some(&png(100, 100)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("3 attempts"));
        // the avatar upload spent the budget; metadata was never attempted
        assert_eq!(market.storage().transport().store_calls(), 3);
        assert_eq!(market.signer().call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_username_is_rejected() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        let err = market
            .create_profile(ProfileInput::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidInput(_)));
        assert_eq!(market.storage().transport().store_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_targets_object() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        let published = market
            .update_profile("0xprofile", alice(), None)
            .await
            .unwrap();

        let calls = market.signer().calls();
        assert_eq!(calls[0].function(), Some(("user_profile", "update_profile")));
        assert_eq!(calls[0].arguments[0], CallArg::Object("0xprofile".into()));
        assert_eq!(
            calls[0].arguments[1],
            CallArg::String(published.metadata_blob_id.to_string())
        );

        let view = market
            .load_profile(published.metadata_blob_id.as_str())
            .await
            .unwrap();
        assert!(view.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_create_listing_uploads_images_in_order() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        let input = ListingInput {
            title: "Smart contract audit".into(),
            description: "Move package review".into(),
            category: None,
            price: 1.5,
        };

        let published = market
            .create_listing(input, &[png(1600, 1200), png(300, 200)])
            .await
            .unwrap();

        assert_eq!(market.storage().transport().store_calls(), 3);

        let metadata: ListingMetadata = market
            .storage()
            .retrieve_json(published.metadata_blob_id.as_str())
            .await
            .unwrap();
        assert_eq!(metadata.category, "Other");
        assert_eq!(metadata.image_blob_ids.len(), 2);

        let calls = market.signer().calls();
        assert_eq!(calls[0].function(), Some(("listings", "create_listing")));
        assert_eq!(calls[0].arguments[1], CallArg::U64(1_500_000_000));
    }

    #[tokio::test]
    async fn test_mint_nft_embeds_image_url() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new()).with_package_id("0xfeed");
        let input = NftInput {
            name: "Genesis badge".into(),
            ..Default::default()
        };

        let published = market.mint_nft(input, &png(2000, 1000)).await.unwrap();

        let metadata: NftMetadata = market
            .storage()
            .retrieve_json(published.metadata_blob_id.as_str())
            .await
            .unwrap();
        assert!(metadata.image.ends_with(metadata.image_blob_id.as_str()));

        let calls = market.signer().calls();
        assert_eq!(calls[0].target, "0xfeed::nft::mint_nft");
        assert_eq!(calls[0].arguments[0], CallArg::String("Genesis badge".into()));
    }

    #[tokio::test]
    async fn test_create_proposal_default_duration() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        let input = ProposalInput {
            title: "Reduce listing fee".into(),
            description: "From 2% to 1%".into(),
            voting_duration: None,
        };

        market.create_proposal(input).await.unwrap();

        let calls = market.signer().calls();
        assert_eq!(calls[0].function(), Some(("governance", "create_proposal")));
        assert_eq!(calls[0].arguments[2], CallArg::U64(7));
    }

    #[tokio::test]
    async fn test_purchase_service_pays_price_in_mist() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());

        let outcome = market.purchase_service("0xlisting", 2.25).await.unwrap();

        assert_eq!(outcome.status, TxStatus::Success);
        let calls = market.signer().calls();
        assert_eq!(calls[0].function(), Some(("listings", "purchase_service")));
        assert_eq!(
            calls[0].arguments,
            vec![
                CallArg::Object("0xlisting".into()),
                CallArg::GasCoin(2_250_000_000),
            ]
        );
        // purchases touch no blobs
        assert_eq!(market.storage().transport().store_calls(), 0);
    }

    #[tokio::test]
    async fn test_purchase_service_rejects_bad_input() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());
        assert!(matches!(
            market.purchase_service("0xlisting", 0.0).await,
            Err(SdkError::InvalidInput(_))
        ));
        assert!(matches!(
            market.purchase_service(" ", 1.0).await,
            Err(SdkError::InvalidInput(_))
        ));
        assert_eq!(market.signer().call_count(), 0);
    }

    #[tokio::test]
    async fn test_vote_on_proposal() {
        let market = marketplace(MemoryTransport::new(), MockSigner::new());

        market.vote_on_proposal("0xproposal", false).await.unwrap();

        let calls = market.signer().calls();
        assert_eq!(calls[0].function(), Some(("governance", "vote")));
        assert_eq!(
            calls[0].arguments,
            vec![CallArg::Object("0xproposal".into()), CallArg::Bool(false)]
        );
    }

    #[tokio::test]
    async fn test_failed_vote_is_an_error() {
        let market = marketplace(
            MemoryTransport::new(),
            MockSigner::new().with_failure("EAlreadyVoted"),
        );
        let err = market.vote_on_proposal("0xproposal", true).await.unwrap_err();
        assert!(matches!(err, SdkError::Transaction { ref reason, .. } if reason == "EAlreadyVoted"));
    }

    #[tokio::test]
    async fn test_wallet_rejection_surfaces() {
        let market = marketplace(
            MemoryTransport::new(),
            MockSigner::new().with_error(SignerError::Rejected),
        );
        let err = market.create_profile(alice(), None).await.unwrap_err();
        assert!(matches!(err, SdkError::Signer(SignerError::Rejected)));
    }

    #[tokio::test]
    async fn test_failed_transaction_is_an_error() {
        let market = marketplace(
            MemoryTransport::new(),
            MockSigner::new().with_failure("InsufficientGas"),
        );
        let err = market.create_profile(alice(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Transaction mock-digest-1 failed: InsufficientGas");
    }
}
