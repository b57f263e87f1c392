//! Marketplace SDK
//!
//! Client-side flows of the Sui freelance marketplace: profiles, service
//! listings, NFTs, governance proposals and direct messages. Content lives
//! in Walrus (via `walrus-storage-client`); the chain only stores blob
//! identifiers, submitted through a [`WalletSigner`].
//!
//! ```rust,no_run
//! use marketplace_sdk::{Marketplace, MockSigner, ProfileInput};
//! use std::sync::Arc;
//! use walrus_storage_client::{BlobClient, StorageConfig};
//!
//! # async fn example() -> marketplace_sdk::Result<()> {
//! let storage = Arc::new(BlobClient::new(StorageConfig::default())?);
//! let market = Marketplace::new(storage, MockSigner::new());
//!
//! let published = market
//!     .create_profile(
//!         ProfileInput {
//!             username: "alice".into(),
//!             ..Default::default()
//!         },
//!         None,
//!     )
//!     .await?;
//! println!("profile metadata at {}", published.metadata_blob_id);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod error;
pub mod marketplace;
pub mod metadata;
pub mod units;
pub mod wallet;

pub use chat::{ChatMessage, ChatSession, Conversation, ConversationDirectory, ConversationSummary, HistoryEntry};
pub use error::{Result, SdkError, SignerError};
pub use marketplace::{Marketplace, Published};
pub use metadata::*;
pub use units::{format_sui, mist_to_sui, sui_to_mist, MIST_PER_SUI};
pub use wallet::{CallArg, MockSigner, TransactionPayload, TxOutcome, TxStatus, WalletSigner};
