//! Self-healing recovery of tool calls the model wrote as free text.
//!
//! When the upstream model puts a tool invocation in its text content
//! instead of the structured `tool_calls` channel, or the JSON is cut off
//! mid-stream, the healer tries an ordered chain of strategies:
//!
//! 1. parse the outermost complete `{...}` span;
//! 2. take everything from the first `{` to the end, append the missing
//!    closers, and parse that;
//! 3. if nothing parses, pull a known tool `"name"` and known parameter
//!    fields out with regexes.
//!
//! A parsed object is then searched (two levels deep) for a tool name.

use medibook_core::tool::{Parameters, ToolName};
use regex_lite::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::sanitizer::strip_reasoning;

/// Words suggesting the text is a tool invocation.
const TRIGGER_KEYWORDS: [&str; 3] = ["tool", "search", "check"];

/// Parameter fields recovered by the regex fallback.
const KNOWN_PARAMETER_FIELDS: [&str; 7] = [
    "location",
    "doctorName",
    "clinicName",
    "serviceName",
    "specialty",
    "date",
    "query",
];

/// Sibling fields that may carry a named call's parameters.
const PARAMETER_KEYS: [&str; 3] = ["parameters", "args", "arguments"];

const MAX_SCAN_DEPTH: usize = 2;

static NAME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""name"\s*:\s*"([A-Za-z_]+)""#).expect("NAME_FIELD is a compile-time constant")
});

static STRING_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([A-Za-z_]+)"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("STRING_FIELD is a compile-time constant")
});

/// Which strategy recovered the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CompleteJson,
    RepairedJson,
    FieldExtraction,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::CompleteJson => "complete_json",
            Strategy::RepairedJson => "repaired_json",
            Strategy::FieldExtraction => "field_extraction",
        })
    }
}

/// A tool call recovered from text.
#[derive(Debug, Clone, PartialEq)]
pub struct HealedCall {
    pub name: ToolName,
    pub parameters: Parameters,
    pub strategy: Strategy,
}

#[derive(Debug, thiserror::Error)]
enum HealError {
    #[error("no JSON object in content")]
    NoJson,

    #[error("unparseable JSON: {0}")]
    Unparseable(#[from] serde_json::Error),

    #[error("no known tool name found")]
    NoKnownTool,
}

/// Whether content without structured tool calls looks like a tool call
/// written as text.
pub fn needs_healing(content: &str) -> bool {
    let stripped = strip_reasoning(content);
    stripped.contains('{') && TRIGGER_KEYWORDS.iter().any(|k| stripped.contains(k))
}

/// Try to recover a single tool call from `content`.
pub fn heal(content: &str) -> Option<HealedCall> {
    let text = strip_reasoning(content);

    let parsed = parse_complete_span(&text)
        .map(|v| (v, Strategy::CompleteJson))
        .or_else(|e| {
            debug!(error = %e, "Complete JSON span unusable, trying truncation repair");
            parse_truncated_span(&text).map(|v| (v, Strategy::RepairedJson))
        });

    match parsed {
        Ok((value, strategy)) => {
            let (name, parameters) = scan_for_tool(&value, 0)?;
            Some(HealedCall {
                name,
                parameters,
                strategy,
            })
        }
        Err(e) => {
            debug!(error = %e, "JSON recovery failed, falling back to field extraction");
            extract_fields(&text).ok()
        }
    }
}

/// Close every bracket and string left open in a truncated JSON fragment.
///
/// Closers are appended innermost first. Brackets inside strings are
/// ignored, and an unterminated string is closed before any bracket.
pub fn repair_truncated(fragment: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in fragment.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    let mut repaired = fragment.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }
    repaired.extend(open.iter().rev());
    repaired
}

/// Greedy: first `{` through last `}`.
fn parse_complete_span(text: &str) -> Result<Value, HealError> {
    let start = text.find('{').ok_or(HealError::NoJson)?;
    let end = text.rfind('}').filter(|&end| end > start).ok_or(HealError::NoJson)?;
    Ok(serde_json::from_str(&text[start..=end])?)
}

/// First `{` through end of text, repaired.
fn parse_truncated_span(text: &str) -> Result<Value, HealError> {
    let start = text.find('{').ok_or(HealError::NoJson)?;
    let repaired = repair_truncated(text[start..].trim_end());
    Ok(serde_json::from_str(&repaired)?)
}

/// Search objects in key order for a tool name, at most two levels down.
///
/// A key that is itself a tool name wins with its value as parameters;
/// otherwise a `name` key holding a tool name wins with its sibling
/// `parameters`/`args`/`arguments`. Arrays do not count as a level.
fn scan_for_tool(value: &Value, depth: usize) -> Option<(ToolName, Parameters)> {
    match value {
        Value::Object(map) => {
            for (key, field) in map {
                if let Ok(name) = key.parse::<ToolName>() {
                    return Some((name, as_parameters(field)));
                }
                if key == "name" {
                    if let Some(name) = field.as_str().and_then(|s| s.parse::<ToolName>().ok()) {
                        let parameters = PARAMETER_KEYS
                            .iter()
                            .find_map(|k| map.get(*k))
                            .map(as_parameters)
                            .unwrap_or_default();
                        return Some((name, parameters));
                    }
                }
            }
            if depth < MAX_SCAN_DEPTH {
                map.values().find_map(|v| scan_for_tool(v, depth + 1))
            } else {
                None
            }
        }
        Value::Array(items) => items.iter().find_map(|v| scan_for_tool(v, depth)),
        _ => None,
    }
}

/// An object, or a string holding a JSON object; anything else is empty.
fn as_parameters(value: &Value) -> Parameters {
    match value {
        Value::Object(map) => map.clone(),
        Value::String(s) => serde_json::from_str::<Parameters>(s).unwrap_or_default(),
        _ => Parameters::new(),
    }
}

fn extract_fields(text: &str) -> Result<HealedCall, HealError> {
    let name = NAME_FIELD
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| m.as_str().parse::<ToolName>().ok())
        .ok_or(HealError::NoKnownTool)?;

    let mut parameters = Parameters::new();
    for caps in STRING_FIELD.captures_iter(text) {
        let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let key = key.as_str();
        if KNOWN_PARAMETER_FIELDS.contains(&key) && !parameters.contains_key(key) {
            let value = serde_json::from_str::<String>(&format!("\"{}\"", raw.as_str()))
                .unwrap_or_else(|_| raw.as_str().to_string());
            parameters.insert(key.to_string(), Value::String(value));
        }
    }

    Ok(HealedCall {
        name,
        parameters,
        strategy: Strategy::FieldExtraction,
    })
}
