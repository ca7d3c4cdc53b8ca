//! The tool-calling orchestration engine of MediBook.
//!
//! One inbound message is answered like this:
//!
//! 1. **Build context**: the dynamic system instruction plus chat history
//! 2. **Interpret** the agent's completion into text and tool calls,
//!    healing tool calls the model wrote as text
//! 3. **If tool calls**: dispatch them in order, answer directly from a
//!    disambiguation or ready-made result, otherwise report the results
//!    back and loop to step 2
//! 4. **If text**: sanitize it and return it
//!
//! The loop is bounded by a maximum number of tool round-trips and always
//! ends in a user-facing string.

pub mod context;
pub mod healer;
pub mod inbound;
pub mod interpreter;
pub mod loop_runner;
pub mod normalizer;
pub mod sanitizer;

#[cfg(test)]
mod test_helpers;

pub use context::ContextBuilder;
pub use inbound::MessageHandler;
pub use interpreter::{AGENT_OVERLOADED, AGENT_UNREACHABLE, ResponseInterpreter};
pub use loop_runner::{AgentLoop, COULD_NOT_PROCESS, TOO_MANY_STEPS};
pub use sanitizer::{Sanitized, sanitize};
