//! Tool call normalization.
//!
//! The agent service returns tool calls either in the OpenAI function
//! wrapper form or already in canonical form. Both become [`ToolCall`].
//! Nothing here fails: a shape we cannot read turns into a call the
//! dispatcher will report as unknown.

use medibook_core::tool::{Parameters, ToolCall};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Name given to calls whose name could not be read.
pub const UNKNOWN_TOOL: &str = "unknown";

/// The shapes a raw `tool_calls` entry comes in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawToolCall {
    /// `{id, type: "function", function: {name, arguments}}`
    Function {
        #[serde(default)]
        id: Option<String>,
        function: RawFunction,
    },

    /// `{id, name, parameters}`
    Canonical {
        id: String,
        name: String,
        parameters: Parameters,
    },

    /// Anything else
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFunction {
    pub name: String,

    /// A JSON-encoded string or an already decoded object
    #[serde(default)]
    pub arguments: Value,
}

impl From<&Value> for RawToolCall {
    fn from(value: &Value) -> Self {
        RawToolCall::deserialize(value).unwrap_or_else(|_| RawToolCall::Other(value.clone()))
    }
}

impl RawToolCall {
    pub fn into_canonical(self) -> ToolCall {
        match self {
            RawToolCall::Function { id, function } => {
                let parameters = decode_arguments(&function.name, function.arguments);
                ToolCall::new(id.unwrap_or_else(random_id), function.name, parameters)
            }
            RawToolCall::Canonical {
                id,
                name,
                parameters,
            } => ToolCall::new(id, name, parameters),
            RawToolCall::Other(value) => {
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_TOOL)
                    .to_string();
                let parameters = value
                    .get("parameters")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                ToolCall::new(random_id(), name, parameters)
            }
        }
    }
}

/// Normalize the raw `tool_calls` field. Anything but an array is empty.
pub fn normalize(raw: &Value) -> Vec<ToolCall> {
    match raw {
        Value::Array(entries) => entries
            .iter()
            .map(|entry| RawToolCall::from(entry).into_canonical())
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_arguments(tool: &str, arguments: Value) -> Parameters {
    match arguments {
        Value::Object(map) => map,
        Value::String(s) if s.trim().is_empty() => Parameters::new(),
        Value::String(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            warn!(tool = %tool, error = %e, "Tool call arguments are not a JSON object, using {{}}");
            Parameters::new()
        }),
        _ => Parameters::new(),
    }
}

fn random_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
