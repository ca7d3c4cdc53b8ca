//! # MediBook Core
//!
//! Domain types, traits, and error definitions for the MediBook clinic
//! booking assistant. This crate has **no framework dependencies** — it
//! defines the domain model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration engine is a trait here:
//! - [`Provider`] — the external agent completion service
//! - [`Tool`] — a domain lookup (doctor search, schedules, ...)
//! - [`Channel`] — the chat transport
//!
//! Implementations live in their respective crates, so the engine can be
//! exercised with scripted stand-ins in tests.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod tool;
pub mod agent;
pub mod calendar;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use tool::{Tool, ToolCall, ToolName, ToolRegistry, ToolResult};
pub use agent::{AgentResponse, OrchestrationState};
pub use event::{DomainEvent, EventBus};
