//! Tool trait and dispatcher — the abstraction over domain lookups.
//!
//! The assistant has a closed vocabulary of five tools. Each one is a black
//! box from parameters to a JSON object; the dispatcher routes a canonical
//! [`ToolCall`] to its handler and turns every failure into an error payload
//! so one bad tool never aborts a batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Parameters of a tool call.
pub type Parameters = Map<String, Value>;

/// Output `status` value signalling the user must be asked a question.
pub const STATUS_DISAMBIGUATION: &str = "disambiguation_needed";

/// The fixed set of tools the agent may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchClinics,
    SearchServices,
    SearchDoctors,
    CheckDoctorSchedule,
    FindAvailableDoctors,
}

impl ToolName {
    /// Every known tool, in a stable order.
    pub const ALL: [ToolName; 5] = [
        ToolName::SearchClinics,
        ToolName::SearchServices,
        ToolName::SearchDoctors,
        ToolName::CheckDoctorSchedule,
        ToolName::FindAvailableDoctors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchClinics => "search_clinics",
            ToolName::SearchServices => "search_services",
            ToolName::SearchDoctors => "search_doctors",
            ToolName::CheckDoctorSchedule => "check_doctor_schedule",
            ToolName::FindAvailableDoctors => "find_available_doctors",
        }
    }

    /// Whether `name` is part of the vocabulary.
    pub fn is_known(name: &str) -> bool {
        name.parse::<ToolName>().is_ok()
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::NotFound(s.to_string()))
    }
}

/// A canonical tool call: `{id, name, parameters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the call with its [`ToolResult`]; unique within one turn
    pub id: String,

    /// Name of the tool to execute (may be outside the vocabulary)
    pub name: String,

    /// Decoded parameters
    #[serde(default)]
    pub parameters: Parameters,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
        }
    }
}

/// The outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub id: String,

    /// Name of the tool that was called
    pub tool: String,

    /// The tool's output object, or an `{error, ...}` payload
    pub output: Value,
}

impl ToolResult {
    /// Pair an output object with the call that produced it.
    pub fn new(call: &ToolCall, output: Value) -> Self {
        Self {
            id: call.id.clone(),
            tool: call.name.clone(),
            output,
        }
    }

    /// `(message, question)` when the tool asked for disambiguation.
    pub fn disambiguation(&self) -> Option<(&str, &str)> {
        if self.output.get("status").and_then(Value::as_str) != Some(STATUS_DISAMBIGUATION) {
            return None;
        }
        let message = self.output.get("message").and_then(Value::as_str).unwrap_or_default();
        let question = self.output.get("question").and_then(Value::as_str).unwrap_or_default();
        Some((message, question))
    }

    /// A ready-to-send reply produced by the tool, if any.
    pub fn formatted_message(&self) -> Option<&str> {
        self.output
            .get("formattedMessage")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

/// A domain tool handler.
///
/// Handlers are registered in the [`ToolRegistry`] under one of the
/// [`ToolName`]s. They should report failures through `Err`; the registry
/// converts those into error payloads for the agent to react to.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which vocabulary entry this handler serves.
    fn name(&self) -> ToolName;

    /// A description of what this tool does (sent to the agent).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, parameters: Parameters) -> Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the agent.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The tool dispatcher: routes canonical calls to registered handlers.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler for the same tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Get a handler by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        let name = name.parse::<ToolName>().ok()?;
        self.tools.get(&name).map(|t| t.as_ref())
    }

    /// Tool definitions in vocabulary order (for sending to the agent).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute one call. Never fails: unknown names and handler errors
    /// come back as error payloads.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::new(
                call,
                serde_json::json!({ "error": format!("Unknown tool: {}", call.name) }),
            );
        };

        match tool.execute(call.parameters.clone()).await {
            Ok(output) => ToolResult::new(call, output),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::new(
                    call,
                    serde_json::json!({ "error": e.to_string(), "tool": call.name }),
                )
            }
        }
    }

    /// Names of all registered tools.
    pub fn names(&self) -> Vec<&'static str> {
        ToolName::ALL
            .iter()
            .filter(|name| self.tools.contains_key(name))
            .map(|name| name.as_str())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
