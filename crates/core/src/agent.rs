//! Agent response and orchestration state types.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::tool::ToolCall;

/// Default bound on tool-execution round-trips per inbound message.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// An interpreted agent completion.
///
/// Both fields may be empty at once ("nothing actionable"); empty string
/// and empty list are the only representation of absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentResponse {
    /// A text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the content carries anything once whitespace is trimmed.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// The value threaded through the orchestration loop.
///
/// Created fresh for each inbound message and consumed by value: every
/// transition returns a new state rather than mutating a shared one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Prompt history, oldest first (without the dynamic system message)
    pub history: Vec<Message>,

    /// Completed tool round-trips so far
    pub iteration: u32,

    /// Round-trip bound
    pub max_iterations: u32,
}

impl OrchestrationState {
    pub fn new(history: Vec<Message>, max_iterations: u32) -> Self {
        Self {
            history,
            iteration: 0,
            max_iterations,
        }
    }

    /// Whether the round-trip bound has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Append turns to the history.
    pub fn extend(mut self, turns: impl IntoIterator<Item = Message>) -> Self {
        self.history.extend(turns);
        self
    }

    /// Move to the next round-trip.
    pub fn next_iteration(self) -> Self {
        Self {
            iteration: self.iteration + 1,
            ..self
        }
    }
}
