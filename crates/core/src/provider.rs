//! Provider trait — the abstraction over the agent completion service.
//!
//! A Provider sends the prompt history to the upstream model and hands back
//! the first choice's message *as the upstream produced it*. Interpreting
//! that payload (including repairing malformed tool calls) is the agent
//! crate's job, so the raw `tool_calls` field is passed through untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model override; the service default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// The conversation messages, system instruction first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools advertised to the model, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f64 {
    0.1
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The first choice's message from a completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Text content (`null` upstream becomes empty)
    #[serde(default)]
    pub content: String,

    /// The raw `tool_calls` field; may be absent, `null`, or not even a list
    #[serde(default)]
    pub tool_calls: serde_json::Value,

    /// Which model answered, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderResponse {
    /// A plain text completion.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// A completion carrying raw tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            model: None,
        }
    }
}

/// The agent completion service.
///
/// The orchestration loop calls `complete()` without knowing which backend
/// answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get the first choice's message.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check — can we reach the service?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
