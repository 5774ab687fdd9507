use serde::{Deserialize, Serialize};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Parse a wire role, returning `None` for anything but `user`/`assistant`.
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A validated inbound chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub turns: Vec<ChatTurn>,
    /// Whether the caller wants reasoning deltas forwarded.
    pub reasoning: bool,
}

/// Provider stream events, reduced to what the bridge acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    ContentDelta(String),
    ReasoningDelta(String),
    MessageStop,
    UpstreamError(String),
    /// Carries the provider's event type for logging.
    Unrecognized(String),
}

/// Frames of the downstream wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamFrame {
    TextDelta(String),
    ReasoningDelta(String),
    ErrorFrame(String),
    Done,
}

impl DownstreamFrame {
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, DownstreamFrame::Done)
    }
}
