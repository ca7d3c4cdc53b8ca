//! Domain event system — the engine's observability sink.
//!
//! The orchestration engine is handed an [`EventBus`] instead of writing to
//! a global logger. Operators subscribe to see reasoning the sanitizer
//! stripped, healed tool calls, tool timings and delivery failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A new message was received from a channel
    MessageReceived {
        channel: String,
        sender_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// Reasoning markup removed from a reply (never shown to users)
    ReasoningCaptured {
        reasoning: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool call was recovered from free text
    ToolCallHealed {
        tool_name: String,
        strategy: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The agent service call failed and a fallback reply was used
    AgentCallFailed {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A reply reached the transport
    ReplyDelivered {
        channel: String,
        timestamp: DateTime<Utc>,
    },

    /// A reply could not be delivered
    DeliveryFailed {
        channel: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
