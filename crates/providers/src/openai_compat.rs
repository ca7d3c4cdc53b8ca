//! OpenAI-compatible agent service provider.
//!
//! Posts the prompt history to `<endpoint>/api/v1/chat/completions` with a
//! bearer token and returns `choices[0].message` untouched apart from
//! defaulting a `null` content to the empty string. The `tool_calls` field is
//! passed through as raw JSON: the agent crate decides what it means.

use async_trait::async_trait;
use medibook_config::AgentServiceConfig;
use medibook_core::error::ProviderError;
use medibook_core::message::Message;
use medibook_core::provider::*;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Path appended to the configured endpoint.
const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

/// An OpenAI-compatible agent completion client.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider with the given request timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build the provider from the `[agent]` config section.
    pub fn from_config(config: &AgentServiceConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("agent.api_key is not set".into()))?;
        Self::new(
            "agent-service",
            &config.endpoint,
            api_key,
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url, COMPLETIONS_PATH)
    }

    /// Convert our Message types to the wire format.
    ///
    /// Only `role` and `content` go out: tool calls stay in the engine's
    /// history and their results follow as a plain user turn.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to the wire format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function",
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(model) = &request.model {
            body["model"] = serde_json::json!(model);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

/// Map a non-success HTTP status to a provider error.
fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        502..=504 => ProviderError::Unavailable {
            status_code: status,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Extract `choices[0].message` from a completion payload.
fn parse_completion(payload: serde_json::Value) -> Result<ProviderResponse, ProviderError> {
    let message = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .filter(|m| m.is_object())
        .ok_or_else(|| ProviderError::MalformedResponse("missing choices[0].message".into()))?;

    Ok(ProviderResponse {
        content: message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        tool_calls: message.get("tool_calls").cloned().unwrap_or_default(),
        model: payload
            .get("model")
            .and_then(|m| m.as_str())
            .map(String::from),
    })
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl medibook_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Agent service returned error");
            return Err(status_error(status.as_u16(), error_body));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {e}")))?;

        parse_completion(payload)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(!response.status().is_server_error())
    }
}

// --- Wire types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: &'static str,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}
