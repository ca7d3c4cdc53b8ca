//! Inbound message handling: transport event in, reply out.

use chrono::Utc;
use medibook_core::channel::{Channel, ChannelMessage, history_to_conversation};
use medibook_core::error::ChannelError;
use medibook_core::event::{DomainEvent, EventBus};
use medibook_core::message::{Message, Role};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::loop_runner::AgentLoop;

/// Default number of transport messages loaded as prompt history.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const PREVIEW_CHARS: usize = 80;

/// Glue between a [`Channel`] and the [`AgentLoop`].
///
/// Transport failures (typing indicators, history, delivery) are logged
/// and never change the reply.
pub struct MessageHandler {
    agent: Arc<AgentLoop>,
    channel: Arc<dyn Channel>,
    event_bus: Arc<EventBus>,
    history_limit: usize,
}

impl MessageHandler {
    pub fn new(agent: Arc<AgentLoop>, channel: Arc<dyn Channel>, event_bus: Arc<EventBus>) -> Self {
        Self {
            agent,
            channel,
            event_bus,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Answer one inbound message. `None` when the message is the bot's own.
    pub async fn handle(&self, message: ChannelMessage) -> Option<String> {
        let channel = self.channel.name().to_string();
        if message.sender_id == self.channel.bot_id() {
            debug!(channel = %channel, "Ignoring the bot's own message");
            return None;
        }

        info!(channel = %channel, sender = %message.sender_id, "Message received");
        self.event_bus.publish(DomainEvent::MessageReceived {
            channel: channel.clone(),
            sender_id: message.sender_id.clone(),
            content_preview: message.content.chars().take(PREVIEW_CHARS).collect(),
            timestamp: Utc::now(),
        });

        if let Err(e) = self.channel.start_typing(&message.channel_id).await {
            debug!(channel = %channel, error = %e, "Typing indicator failed");
        }

        let history = self.load_history(&message).await;
        let reply = self.agent.process_message(history).await;

        if let Err(e) = self.channel.stop_typing(&message.channel_id).await {
            debug!(channel = %channel, error = %e, "Clearing typing indicator failed");
        }

        match self.channel.send(&message.channel_id, &reply).await {
            Ok(()) => self.event_bus.publish(DomainEvent::ReplyDelivered {
                channel: channel.clone(),
                timestamp: Utc::now(),
            }),
            Err(e) => {
                warn!(channel = %channel, error = %e, "Failed to deliver reply");
                self.event_bus.publish(DomainEvent::DeliveryFailed {
                    channel,
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        Some(reply)
    }

    /// Consume the channel's inbound stream until it closes.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut inbound = self.channel.start().await?;
        while let Some(event) = inbound.recv().await {
            match event {
                Ok(message) => {
                    self.handle(message).await;
                }
                Err(e) => warn!(channel = %self.channel.name(), error = %e, "Inbound error"),
            }
        }
        info!(channel = %self.channel.name(), "Channel closed");
        Ok(())
    }

    /// Recent transport history as prompt history, ending with the inbound
    /// text as a user turn.
    async fn load_history(&self, message: &ChannelMessage) -> Vec<Message> {
        let mut history = match self
            .channel
            .fetch_history(&message.channel_id, self.history_limit)
            .await
        {
            Ok(messages) => history_to_conversation(&messages, self.channel.bot_id()),
            Err(e) => {
                warn!(channel = %self.channel.name(), error = %e, "History unavailable, using the message alone");
                Vec::new()
            }
        };

        let ends_with_inbound = history
            .last()
            .is_some_and(|m| m.role == Role::User && m.content == message.content);
        if !ends_with_inbound {
            history.push(Message::user(&message.content));
        }
        history
    }
}
