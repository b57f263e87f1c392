//! Direct messages between two addresses, stored as conversation blobs
//!
//! Blobs are immutable, so every message uploads a new copy of the
//! conversation document. The session keeps a directory from conversation
//! id to the latest blob; callers persist it via [`ChatSession::dispose`]
//! and restore it with [`ChatSession::with_directory`].

use crate::error::{Result, SdkError};
use crate::metadata::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walrus_storage_client::{BlobClient, BlobId, BlobTransport, HttpTransport};

/// Conversation id -> latest conversation blob
pub type ConversationDirectory = HashMap<String, BlobId>;

/// Id of the conversation between two addresses, independent of order.
pub fn conversation_id(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("chat_{}_{}", first, second)
}

fn message_id(timestamp: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("msg_{}_{}", timestamp, &suffix[..9])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub timestamp: i64,
}

/// Conversation document as stored in Walrus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: i64,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<i64>,
}

impl Conversation {
    fn new(owner: &str, other: &str) -> Self {
        let mut participants = [owner.to_string(), other.to_string()];
        participants.sort();
        Self {
            id: conversation_id(owner, other),
            participants,
            messages: Vec::new(),
            created_at: now_millis(),
            last_message: None,
            last_message_time: None,
        }
    }

    fn other_participant(&self, owner: &str) -> &str {
        if self.participants[0] == owner {
            &self.participants[1]
        } else {
            &self.participants[0]
        }
    }
}

/// Message as seen by the session owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub from_self: bool,
}

/// Row of the conversation list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub other_participant: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<i64>,
    pub message_count: usize,
}

/// Chat state for one wallet address
pub struct ChatSession<T = HttpTransport> {
    storage: Arc<BlobClient<T>>,
    owner: String,
    directory: ConversationDirectory,
}

impl<T: BlobTransport> ChatSession<T> {
    pub fn initialize(storage: Arc<BlobClient<T>>, owner: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(SdkError::InvalidInput("owner address is required".into()));
        }
        info!(owner = %owner, "Chat session started");
        Ok(Self {
            storage,
            owner,
            directory: ConversationDirectory::new(),
        })
    }

    /// Restore a directory saved by a previous session.
    pub fn with_directory(mut self, directory: ConversationDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn directory(&self) -> &ConversationDirectory {
        &self.directory
    }

    /// Upload an empty conversation with `other` and reference it.
    pub async fn start_conversation(&mut self, other: &str) -> Result<String> {
        self.check_peer(other)?;
        let conversation = Conversation::new(&self.owner, other);
        let blob_id = self.storage.upload_json(&conversation).await?;
        debug!(conversation = %conversation.id, blob_id = %blob_id, "Conversation started");
        self.directory.insert(conversation.id.clone(), blob_id);
        Ok(conversation.id)
    }

    /// Append a message and upload the new conversation document.
    pub async fn send_message(&mut self, recipient: &str, text: &str) -> Result<ChatMessage> {
        self.check_peer(recipient)?;
        if text.trim().is_empty() {
            return Err(SdkError::InvalidInput("message text is required".into()));
        }

        let id = conversation_id(&self.owner, recipient);
        let mut conversation = match self.directory.get(&id) {
            Some(blob_id) => self.load(blob_id).await?,
            None => Conversation::new(&self.owner, recipient),
        };

        let timestamp = now_millis();
        let message = ChatMessage {
            id: message_id(timestamp),
            sender: self.owner.clone(),
            recipient: recipient.to_string(),
            message: text.to_string(),
            timestamp,
        };
        conversation.messages.push(message.clone());
        conversation.last_message = Some(message.message.clone());
        conversation.last_message_time = Some(timestamp);

        let blob_id = self.storage.upload_json(&conversation).await?;
        debug!(
            conversation = %id,
            blob_id = %blob_id,
            messages = conversation.messages.len(),
            "Message sent"
        );
        self.directory.insert(id, blob_id);
        Ok(message)
    }

    /// Messages exchanged with `other`, oldest first.
    pub async fn history(&self, other: &str) -> Result<Vec<HistoryEntry>> {
        let id = conversation_id(&self.owner, other);
        let Some(blob_id) = self.directory.get(&id) else {
            return Ok(Vec::new());
        };

        let conversation = self.load(blob_id).await?;
        Ok(conversation
            .messages
            .into_iter()
            .map(|message| HistoryEntry {
                from_self: message.sender == self.owner,
                message,
            })
            .collect())
    }

    /// Every referenced conversation, most recent first.
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        let mut summaries = Vec::with_capacity(self.directory.len());

        for (id, blob_id) in &self.directory {
            match self.load(blob_id).await {
                Ok(conversation) => summaries.push(ConversationSummary {
                    other_participant: conversation.other_participant(&self.owner).to_string(),
                    id: conversation.id,
                    message_count: conversation.messages.len(),
                    last_message: conversation.last_message,
                    last_message_time: conversation.last_message_time,
                }),
                Err(e) => {
                    warn!(conversation = %id, blob_id = %blob_id, error = %e, "Skipping conversation");
                }
            }
        }

        summaries.sort_by(|a, b| {
            let a_time = a.last_message_time.unwrap_or(0);
            let b_time = b.last_message_time.unwrap_or(0);
            b_time.cmp(&a_time).then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// End the session, returning the directory for the caller to persist.
    pub fn dispose(self) -> ConversationDirectory {
        info!(owner = %self.owner, conversations = self.directory.len(), "Chat session closed");
        self.directory
    }

    async fn load(&self, blob_id: &BlobId) -> Result<Conversation> {
        let conversation: Conversation = self.storage.retrieve_json(blob_id.as_str()).await?;
        if !conversation.participants.iter().any(|p| *p == self.owner) {
            return Err(SdkError::Session(format!(
                "conversation {} does not include {}",
                conversation.id, self.owner
            )));
        }
        Ok(conversation)
    }

    fn check_peer(&self, other: &str) -> Result<()> {
        if other.trim().is_empty() {
            return Err(SdkError::InvalidInput("recipient address is required".into()));
        }
        if other == self.owner {
            return Err(SdkError::InvalidInput("cannot start a conversation with yourself".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walrus_storage_client::{MemoryTransport, StorageConfig};

    fn storage() -> Arc<BlobClient<MemoryTransport>> {
        Arc::new(BlobClient::with_transport(MemoryTransport::new(), StorageConfig::default()).unwrap())
    }

    #[test]
    fn test_conversation_id_is_order_independent() {
        assert_eq!(conversation_id("0xb", "0xa"), "chat_0xa_0xb");
        assert_eq!(conversation_id("0xa", "0xb"), "chat_0xa_0xb");
    }

    #[test]
    fn test_message_id_shape() {
        let id = message_id(1700000000000);
        assert!(id.starts_with("msg_1700000000000_"));
        assert_eq!(id.len(), "msg_1700000000000_".len() + 9);
    }

    #[test]
    fn test_owner_required() {
        assert!(matches!(
            ChatSession::initialize(storage(), "  "),
            Err(SdkError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_send_and_read_history() {
        let storage = storage();
        let mut alice = ChatSession::initialize(storage.clone(), "0xalice").unwrap();

        alice.send_message("0xbob", "hi bob").await.unwrap();
        alice.send_message("0xbob", "are you there?").await.unwrap();

        let history = alice.history("0xbob").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message.message, "hi bob");
        assert!(history.iter().all(|e| e.from_self));

        // Bob restores the same reference and sees the messages as incoming
        let id = conversation_id("0xalice", "0xbob");
        let blob_id = alice.directory()[&id].clone();
        let mut directory = ConversationDirectory::new();
        directory.insert(id, blob_id);
        let bob = ChatSession::initialize(storage, "0xbob")
            .unwrap()
            .with_directory(directory);

        let history = bob.history("0xalice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| !e.from_self));
    }

    #[tokio::test]
    async fn test_each_message_uploads_new_document() {
        let storage = storage();
        let mut session = ChatSession::initialize(storage.clone(), "0xalice").unwrap();

        session.start_conversation("0xbob").await.unwrap();
        let id = conversation_id("0xalice", "0xbob");
        let first = session.directory()[&id].clone();

        session.send_message("0xbob", "hello").await.unwrap();
        let second = session.directory()[&id].clone();

        assert_ne!(first, second);
        assert_eq!(storage.transport().store_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let storage = storage();
        let mut session = ChatSession::initialize(storage.clone(), "0xalice").unwrap();
        assert!(session.send_message("0xbob", "   ").await.is_err());
        assert!(session.send_message("0xalice", "me").await.is_err());
        assert_eq!(storage.transport().store_calls(), 0);
    }

    #[tokio::test]
    async fn test_history_empty_without_conversation() {
        let session = ChatSession::initialize(storage(), "0xalice").unwrap();
        assert!(session.history("0xbob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conversations_sorted_and_unloadable_skipped() {
        let storage = storage();
        let mut session = ChatSession::initialize(storage.clone(), "0xalice").unwrap();

        session.start_conversation("0xcarol").await.unwrap();
        session.send_message("0xbob", "first").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        session.send_message("0xdave", "second").await.unwrap();

        let mut directory = session.dispose();
        directory.insert("chat_0xalice_0xghost".into(), BlobId::new("missing"));
        let session = ChatSession::initialize(storage, "0xalice")
            .unwrap()
            .with_directory(directory);

        let summaries = session.conversations().await;
        let others: Vec<_> = summaries.iter().map(|s| s.other_participant.as_str()).collect();
        assert_eq!(others, vec!["0xdave", "0xbob", "0xcarol"]);
        assert_eq!(summaries[0].last_message.as_deref(), Some("second"));
        assert_eq!(summaries[2].message_count, 0);
    }
}
