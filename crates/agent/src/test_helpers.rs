//! Shared test helpers for agent tests.

use async_trait::async_trait;
use medibook_core::error::{ProviderError, ToolError};
use medibook_core::provider::{Provider, ProviderRequest, ProviderResponse};
use medibook_core::tool::{Parameters, Tool, ToolName};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request. Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Plain text completions, one per call.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(ProviderResponse::text(*t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        if index >= self.responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                self.responses.len()
            );
        }
        requests.push(request);
        self.responses[index].clone()
    }
}

/// A completion carrying one function-wrapped tool call.
pub fn tool_call_response(id: &str, name: &str, arguments: Value) -> ProviderResponse {
    ProviderResponse::with_tool_calls(
        "",
        json!([{
            "id": id,
            "type": "function",
            "function": { "name": name, "arguments": arguments.to_string() }
        }]),
    )
}

/// A tool that returns a fixed output and counts its invocations.
pub struct CountingTool {
    name: ToolName,
    output: Result<Value, String>,
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn returning(name: ToolName, output: Value) -> Self {
        Self {
            name,
            output: Ok(output),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: ToolName, reason: &str) -> Self {
        Self {
            name,
            output: Err(reason.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Invocation counter that stays readable after the tool is registered.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> ToolName {
        self.name
    }

    fn description(&self) -> &str {
        "Counting test tool"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _parameters: Parameters) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name.to_string(),
            reason,
        })
    }
}
