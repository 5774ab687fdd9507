use serde::Deserialize;

use crate::error::BridgeError;
use crate::protocol::canonical::{ChatRequest, ChatRole, ChatTurn};

const INVALID_MESSAGES: &str = "Invalid messages format";

#[derive(Debug, Deserialize)]
struct InboundChatWire {
    #[serde(default)]
    messages: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: bool,
}

#[derive(Debug, Deserialize)]
struct InboundTurnWire {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    parts: Vec<InboundPartWire>,
}

#[derive(Debug, Deserialize)]
struct InboundPartWire {
    #[serde(default)]
    text: Option<String>,
}

/// Parse and validate a browser chat request body.
///
/// The body must be a JSON object whose `messages` field is a non-empty array
/// of `{role, content}` turns. Turn content falls back to `parts[0].text` when
/// `content` is missing or blank; both are trimmed.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidInput`] for malformed JSON, a missing,
/// non-array or empty `messages` field, or a turn with an unknown role.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, BridgeError> {
    let wire: InboundChatWire = serde_json::from_slice(body)
        .map_err(|err| BridgeError::InvalidInput(format!("Invalid JSON body: {err}")))?;

    let Some(serde_json::Value::Array(items)) = wire.messages else {
        return Err(BridgeError::InvalidInput(INVALID_MESSAGES.to_string()));
    };
    if items.is_empty() {
        return Err(BridgeError::InvalidInput(INVALID_MESSAGES.to_string()));
    }

    let mut turns = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let turn: InboundTurnWire = serde_json::from_value(item).map_err(|err| {
            BridgeError::InvalidInput(format!("{INVALID_MESSAGES}: messages[{index}]: {err}"))
        })?;
        turns.push(decode_turn(index, turn)?);
    }

    Ok(ChatRequest {
        turns,
        reasoning: wire.reasoning,
    })
}

fn decode_turn(index: usize, turn: InboundTurnWire) -> Result<ChatTurn, BridgeError> {
    let role_text = turn.role.trim();
    if role_text.is_empty() {
        return Err(BridgeError::InvalidInput(format!(
            "{INVALID_MESSAGES}: messages[{index}] has no role"
        )));
    }
    let role = ChatRole::parse(role_text).ok_or_else(|| {
        BridgeError::InvalidInput(format!(
            "{INVALID_MESSAGES}: messages[{index}] has unsupported role '{role_text}'"
        ))
    })?;

    let from_content = turn
        .content
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    let content = match from_content {
        Some(text) => text.to_string(),
        None => turn
            .parts
            .first()
            .and_then(|part| part.text.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    };

    Ok(ChatTurn { role, content })
}
