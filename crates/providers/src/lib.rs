//! Agent completion service client for MediBook.
//!
//! The provider implements the `medibook_core::Provider` trait over the
//! OpenAI-compatible chat completions wire format.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
