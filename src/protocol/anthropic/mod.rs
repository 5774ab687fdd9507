pub mod encoder;
pub mod stream;

use serde::{Deserialize, Serialize};

/// Anthropic Messages API request wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u64,
    pub system: String,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
    pub stream: bool,
}

/// Anthropic message wire type (plain-text content only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Extended-thinking request block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicThinking {
    #[serde(rename = "type")]
    pub type_: String,
    pub budget_tokens: u64,
}

/// Anthropic SSE stream event.
///
/// Only `content_block_delta`, `message_stop` and `error` carry anything the
/// bridge forwards; the other known kinds are listed so they classify by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicStreamEvent {
    #[serde(rename = "message_start")]
    MessageStart {},
    #[serde(rename = "content_block_start")]
    ContentBlockStart {},
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: AnthropicDelta },
    #[serde(rename = "content_block_stop")]
    ContentBlockStop {},
    #[serde(rename = "message_delta")]
    MessageDelta {},
    #[serde(rename = "message_stop")]
    MessageStop {},
    #[serde(rename = "ping")]
    Ping {},
    #[serde(rename = "error")]
    Error { error: AnthropicErrorBody },
    #[serde(other)]
    Other,
}

/// Delta variants for content block deltas.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

/// Error body, both in-stream and in non-success HTTP responses.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub message: String,
}

/// Envelope of a non-success HTTP response: `{"type":"error","error":{...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorEnvelope {
    pub error: AnthropicErrorBody,
}
