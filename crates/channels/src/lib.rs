//! Chat transports for MediBook.
//!
//! Each channel delivers inbound messages, keeps the conversation history
//! the agent reads back, and carries replies out. Channels are trait-based
//! and platform-agnostic.
//!
//! Available channels:
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;

pub use cli::CliChannel;
