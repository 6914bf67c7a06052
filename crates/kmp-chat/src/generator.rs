//! The text-generation seam used by question generation and compilation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::LLMConfig;
use crate::providers::{collect_stream, stream_llm};
use crate::types::{ChatMessage, GenerationParams};

/// Why a collaborator call produced no usable text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("No LLM provider is configured")]
    NotConfigured,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed reply: {0}")]
    Malformed(String),
}

/// A model that turns a system prompt plus conversation into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free-text completion. Returns the trimmed reply; never empty on `Ok`.
    async fn complete(
        &self,
        system: &str,
        turns: &[ChatMessage],
    ) -> Result<String, CollaboratorError>;

    /// Completion that must be a JSON value.
    async fn complete_structured(
        &self,
        system: &str,
        input: &str,
    ) -> Result<Value, CollaboratorError> {
        let system = format!("{}\n\nRespond with JSON only, no commentary.", system);
        let reply = self.complete(&system, &[ChatMessage::user(input)]).await?;
        parse_json_reply(&reply)
    }
}

/// Extract a JSON value from a model reply, tolerating code fences and
/// leading prose.
pub fn parse_json_reply(reply: &str) -> Result<Value, CollaboratorError> {
    let trimmed = reply.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(value) = serde_json::from_str(unfenced) {
        return Ok(value);
    }

    // Fall back to the outermost object or array in the text.
    let start = unfenced.find(['{', '[']);
    let end = unfenced.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&unfenced[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(CollaboratorError::Malformed(format!(
        "expected JSON, got {} chars of text",
        reply.chars().count()
    )))
}

/// [`TextGenerator`] over the configured external provider.
///
/// The config is shared with the HTTP layer so key changes apply to the next
/// call without a restart. Callers bound each call with their own timeout.
pub struct LlmClient {
    http: Client,
    config: Arc<RwLock<LLMConfig>>,
    params: GenerationParams,
}

impl LlmClient {
    pub fn new(config: Arc<RwLock<LLMConfig>>) -> Self {
        Self {
            http: Client::new(),
            config,
            params: GenerationParams::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn complete(
        &self,
        system: &str,
        turns: &[ChatMessage],
    ) -> Result<String, CollaboratorError> {
        let target = self
            .config
            .read()
            .resolve()
            .ok_or(CollaboratorError::NotConfigured)?;

        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(turns);

        let stream = stream_llm(&self.http, &target, messages, self.params);
        let text = collect_stream(stream).await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(CollaboratorError::Malformed("empty reply".into()));
        }
        debug!("{} replied with {} chars", target.provider, text.chars().count());
        Ok(text.to_string())
    }
}

/// Generator for deployments without any LLM. Every call reports
/// `NotConfigured`, so callers always take their deterministic path.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

#[async_trait]
impl TextGenerator for Unavailable {
    async fn complete(
        &self,
        _system: &str,
        _turns: &[ChatMessage],
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::NotConfigured)
    }
}
