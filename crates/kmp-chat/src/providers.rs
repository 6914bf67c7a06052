//! External LLM provider streaming.
//!
//! Every provider answers with server-sent events. OpenAI and Groq share a
//! payload format; Anthropic uses typed events. The SSE framing is shared and
//! only the per-event parser differs.

use std::pin::Pin;

use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::config::ResolvedProvider;
use crate::generator::CollaboratorError;
use crate::types::{ChatMessage, GenerationParams, LLMProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token, the end marker, or a failure.
#[derive(Debug)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(CollaboratorError),
}

/// Meaning of one SSE `data:` payload.
#[derive(Debug, PartialEq)]
pub enum SseEvent {
    Token(String),
    Done,
    Error(String),
    Skip,
}

/// Stream tokens from the resolved provider.
pub fn stream_llm(
    client: &Client,
    target: &ResolvedProvider,
    messages: Vec<ChatMessage>,
    params: GenerationParams,
) -> BoxedStream {
    debug!(
        "Streaming from {} with model {} ({} messages)",
        target.provider,
        target.model,
        messages.len()
    );
    match target.provider {
        LLMProvider::OpenAI => Box::pin(sse_stream(
            openai_compat_request(client, OPENAI_URL, target, &messages, params),
            parse_openai_event,
        )),
        LLMProvider::Groq => Box::pin(sse_stream(
            openai_compat_request(client, GROQ_URL, target, &messages, params),
            parse_openai_event,
        )),
        LLMProvider::Anthropic => Box::pin(sse_stream(
            anthropic_request(client, target, &messages, params),
            parse_anthropic_event,
        )),
    }
}

fn openai_compat_request(
    client: &Client,
    url: &str,
    target: &ResolvedProvider,
    messages: &[ChatMessage],
    params: GenerationParams,
) -> RequestBuilder {
    client
        .post(url)
        .header("Authorization", format!("Bearer {}", target.api_key))
        .header("Content-Type", "application/json")
        .json(&json!({
            "model": target.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": true,
        }))
}

fn anthropic_request(
    client: &Client,
    target: &ResolvedProvider,
    messages: &[ChatMessage],
    params: GenerationParams,
) -> RequestBuilder {
    // Anthropic takes the system prompt as a top-level field.
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let conversation: Vec<&ChatMessage> = messages.iter().filter(|m| m.role != "system").collect();

    let mut body = json!({
        "model": target.model,
        "messages": conversation,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "stream": true,
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }

    client
        .post(ANTHROPIC_URL)
        .header("x-api-key", &target.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
        .json(&body)
}

/// Parse an OpenAI-compatible chunk.
pub fn parse_openai_event(data: &str) -> SseEvent {
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(parsed) => {
            if let Some(msg) = parsed["error"]["message"].as_str() {
                return SseEvent::Error(msg.to_string());
            }
            match parsed["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => SseEvent::Token(content.to_string()),
                _ => SseEvent::Skip,
            }
        }
        Err(_) => SseEvent::Skip,
    }
}

/// Parse an Anthropic Messages API event.
pub fn parse_anthropic_event(data: &str) -> SseEvent {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseEvent::Skip;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => SseEvent::Token(text.to_string()),
            _ => SseEvent::Skip,
        },
        Some("message_stop") => SseEvent::Done,
        Some("error") => SseEvent::Error(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        _ => SseEvent::Skip,
    }
}

/// Send the request and turn its SSE body into stream chunks.
///
/// Lines are split on raw bytes so multi-byte characters cut across network
/// chunks are decoded intact.
fn sse_stream(
    request: RequestBuilder,
    parse: fn(&str) -> SseEvent,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(CollaboratorError::Request(e.to_string()));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(CollaboratorError::Upstream(format!(
                "API error {}: {}",
                status, body
            )));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(CollaboratorError::Request(format!(
                        "Stream read error: {}",
                        e
                    )));
                    return;
                }
            };
            buffer.extend_from_slice(&bytes);

            while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&raw);
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };

                match parse(data.trim()) {
                    SseEvent::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseEvent::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseEvent::Error(msg) => {
                        error!("Provider stream error: {}", msg);
                        yield StreamChunk::Error(CollaboratorError::Upstream(msg));
                        return;
                    }
                    SseEvent::Skip => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

/// Drain a token stream into the full reply text.
pub async fn collect_stream<S>(mut stream: S) -> Result<String, CollaboratorError>
where
    S: Stream<Item = StreamChunk> + Unpin,
{
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(t) => text.push_str(&t),
            StreamChunk::Done { tokens_used } => {
                debug!("Stream finished after {} tokens", tokens_used);
                break;
            }
            StreamChunk::Error(e) => return Err(e),
        }
    }
    Ok(text)
}

/// Test an API key by making a minimal request.
pub async fn test_api_key(provider: LLMProvider, api_key: &str) -> Result<(), CollaboratorError> {
    let client = Client::new();

    let request = match provider {
        LLMProvider::OpenAI => client
            .get("https://api.openai.com/v1/models")
            .header("Authorization", format!("Bearer {}", api_key)),
        LLMProvider::Groq => client
            .get("https://api.groq.com/openai/v1/models")
            .header("Authorization", format!("Bearer {}", api_key)),
        LLMProvider::Anthropic => client
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": "claude-3-5-haiku-20241022",
                "max_tokens": 1,
                "messages": [{"role": "user", "content": "Hi"}],
            })),
    };

    let resp = request
        .send()
        .await
        .map_err(|e| CollaboratorError::Request(e.to_string()))?;

    // Anthropic answers 400 for a valid key with a quota or model problem.
    let accepted = resp.status().is_success()
        || (provider == LLMProvider::Anthropic && resp.status().as_u16() == 400);
    if accepted {
        Ok(())
    } else {
        Err(CollaboratorError::Upstream(format!(
            "API returned status {}",
            resp.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_events() {
        assert_eq!(parse_openai_event("[DONE]"), SseEvent::Done);
        assert_eq!(
            parse_openai_event(r#"{"choices":[{"delta":{"content":"مرحبا"}}]}"#),
            SseEvent::Token("مرحبا".into())
        );
        assert_eq!(
            parse_openai_event(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Skip
        );
        assert_eq!(
            parse_openai_event(r#"{"error":{"message":"rate limited"}}"#),
            SseEvent::Error("rate limited".into())
        );
        assert_eq!(parse_openai_event("not json"), SseEvent::Skip);
    }

    #[test]
    fn test_anthropic_events() {
        assert_eq!(
            parse_anthropic_event(r#"{"type":"content_block_delta","delta":{"text":"نعم"}}"#),
            SseEvent::Token("نعم".into())
        );
        assert_eq!(
            parse_anthropic_event(r#"{"type":"message_stop"}"#),
            SseEvent::Done
        );
        assert_eq!(
            parse_anthropic_event(r#"{"type":"error","error":{"message":"overloaded"}}"#),
            SseEvent::Error("overloaded".into())
        );
        assert_eq!(parse_anthropic_event(r#"{"type":"ping"}"#), SseEvent::Skip);
    }

    #[tokio::test]
    async fn test_collect_stream_concatenates_tokens() {
        let chunks = vec![
            StreamChunk::Token("ما ".into()),
            StreamChunk::Token("السبب؟".into()),
            StreamChunk::Done { tokens_used: 2 },
            StreamChunk::Token("ignored".into()),
        ];
        let text = collect_stream(futures::stream::iter(chunks)).await.unwrap();
        assert_eq!(text, "ما السبب؟");
    }

    #[tokio::test]
    async fn test_collect_stream_surfaces_errors() {
        let chunks = vec![
            StreamChunk::Token("partial".into()),
            StreamChunk::Error(CollaboratorError::Upstream("API error 500".into())),
        ];
        let err = collect_stream(futures::stream::iter(chunks)).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Upstream(_)));
    }
}
