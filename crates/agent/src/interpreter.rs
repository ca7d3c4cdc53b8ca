//! Response interpretation: one agent call in, one [`AgentResponse`] out.
//!
//! Never fails. A provider error becomes a fixed apology with no tool
//! calls; a completion that wrote its tool call as text is healed.

use chrono::Utc;
use medibook_core::agent::AgentResponse;
use medibook_core::error::ProviderError;
use medibook_core::event::{DomainEvent, EventBus};
use medibook_core::message::Message;
use medibook_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use medibook_core::tool::ToolCall;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::{healer, normalizer};

/// Reply when the agent service reports it is overloaded (502/503/504).
pub const AGENT_OVERLOADED: &str =
    "Xin lỗi, hệ thống AI đang quá tải. Bạn vui lòng thử lại sau ít phút nhé.";

/// Reply for every other agent service failure.
pub const AGENT_UNREACHABLE: &str =
    "Xin lỗi, tôi không thể kết nối tới hệ thống AI lúc này. Bạn vui lòng thử lại sau.";

pub struct ResponseInterpreter {
    provider: Arc<dyn Provider>,
    context: ContextBuilder,
    event_bus: Arc<EventBus>,
    model: Option<String>,
    temperature: f64,
    max_tokens: Option<u32>,
    tools: Vec<ToolDefinition>,
}

impl ResponseInterpreter {
    pub fn new(provider: Arc<dyn Provider>, context: ContextBuilder, event_bus: Arc<EventBus>) -> Self {
        Self {
            provider,
            context,
            event_bus,
            model: None,
            temperature: 0.1,
            max_tokens: Some(1000),
            tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Send these tool definitions in the structured request field.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Build the request for `history`, system instruction first.
    pub fn request(&self, history: &[Message], now: chrono::DateTime<Utc>) -> ProviderRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.context.build(now)));
        messages.extend_from_slice(history);

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.clone(),
        }
    }

    /// Call the agent with `history` and interpret what comes back.
    pub async fn interpret(&self, history: &[Message]) -> AgentResponse {
        let request = self.request(history, Utc::now());
        debug!(
            provider = self.provider.name(),
            messages = request.messages.len(),
            "Calling agent service"
        );

        match self.provider.complete(request).await {
            Ok(completion) => self.interpret_completion(completion),
            Err(e) => self.fallback(&e),
        }
    }

    /// Turn a raw completion into content plus canonical tool calls.
    pub fn interpret_completion(&self, completion: ProviderResponse) -> AgentResponse {
        let tool_calls = normalizer::normalize(&completion.tool_calls);
        if !tool_calls.is_empty() {
            return AgentResponse {
                content: completion.content,
                tool_calls,
            };
        }

        if healer::needs_healing(&completion.content) {
            if let Some(healed) = healer::heal(&completion.content) {
                info!(
                    tool = %healed.name,
                    strategy = %healed.strategy,
                    "Recovered tool call from response text"
                );
                self.event_bus.publish(DomainEvent::ToolCallHealed {
                    tool_name: healed.name.to_string(),
                    strategy: healed.strategy.to_string(),
                    timestamp: Utc::now(),
                });
                let id = format!("call_healed_{}", Utc::now().timestamp_millis());
                return AgentResponse {
                    content: String::new(),
                    tool_calls: vec![ToolCall::new(id, healed.name.as_str(), healed.parameters)],
                };
            }
            debug!("Response looked like a tool call but nothing was recoverable");
        }

        AgentResponse::text(completion.content)
    }

    fn fallback(&self, error: &ProviderError) -> AgentResponse {
        warn!(provider = self.provider.name(), error = %error, "Agent service call failed");
        self.event_bus.publish(DomainEvent::AgentCallFailed {
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });

        if error.is_unavailable() {
            AgentResponse::text(AGENT_OVERLOADED)
        } else {
            AgentResponse::text(AGENT_UNREACHABLE)
        }
    }
}
