//! Channel trait — the abstraction over the chat transport.
//!
//! A Channel delivers inbound user messages, keeps the durable chat history,
//! and carries the assistant's replies back. The engine itself is stateless
//! between messages; everything persistent lives behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;
use crate::message::Message;

/// Identifier of a conversation channel (a DM, a room, a CLI session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as the transport sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Sender identifier (the bot's own id for its replies)
    pub sender_id: String,

    /// The text content
    pub content: String,
}

impl ChannelMessage {
    pub fn new(
        channel_id: ChannelId,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id,
            sender_id: sender_id.into(),
            content: content.into(),
        }
    }
}

/// Map transport history to prompt history: the bot's own messages become
/// `assistant` turns, everybody else's `user` turns. Order is preserved.
pub fn history_to_conversation(history: &[ChannelMessage], bot_id: &str) -> Vec<Message> {
    history
        .iter()
        .map(|m| {
            if m.sender_id == bot_id {
                Message::assistant(&m.content)
            } else {
                Message::user(&m.content)
            }
        })
        .collect()
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "cli").
    fn name(&self) -> &str;

    /// The identity the assistant posts as on this transport.
    fn bot_id(&self) -> &str;

    /// Start listening for incoming messages.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Fetch the last `limit` messages of a channel, oldest first.
    async fn fetch_history(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> std::result::Result<Vec<ChannelMessage>, ChannelError>;

    /// Show a typing indicator (if the platform supports it).
    async fn start_typing(&self, _channel_id: &ChannelId) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Clear the typing indicator.
    async fn stop_typing(&self, _channel_id: &ChannelId) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Send a text message as the bot identity.
    async fn send(&self, channel_id: &ChannelId, content: &str) -> std::result::Result<(), ChannelError>;
}
