//! Text-generation collaborator backed by external LLM APIs
//! (OpenAI/Anthropic/Groq).
//!
//! Callers depend on the [`TextGenerator`] trait and branch on
//! [`CollaboratorError`]; no call here ever panics on a bad reply.

pub mod config;
pub mod generator;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use generator::{parse_json_reply, CollaboratorError, LlmClient, TextGenerator, Unavailable};
pub use types::*;
