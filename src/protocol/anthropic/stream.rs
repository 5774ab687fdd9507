use serde::Deserialize;

use crate::error::BridgeError;
use crate::protocol::anthropic::{AnthropicDelta, AnthropicStreamEvent};
use crate::protocol::canonical::UpstreamEvent;

#[derive(Deserialize)]
struct EventTypeOnly {
    #[serde(rename = "type", default)]
    type_: String,
}

/// Parse one SSE data payload and classify it.
///
/// # Errors
///
/// Returns [`BridgeError::DecodeFault`] when the payload is not a well-formed
/// stream event. Callers skip the line and keep streaming.
pub fn interpret_payload(payload: &str) -> Result<UpstreamEvent, BridgeError> {
    let event: AnthropicStreamEvent = serde_json::from_str(payload)
        .map_err(|err| BridgeError::DecodeFault(format!("malformed stream payload: {err}")))?;
    Ok(classify_event(event, payload))
}

fn classify_event(event: AnthropicStreamEvent, payload: &str) -> UpstreamEvent {
    match event {
        AnthropicStreamEvent::ContentBlockDelta { delta } => match delta {
            AnthropicDelta::TextDelta { text } if !text.is_empty() => {
                UpstreamEvent::ContentDelta(text)
            }
            AnthropicDelta::ThinkingDelta { thinking } if !thinking.is_empty() => {
                UpstreamEvent::ReasoningDelta(thinking)
            }
            AnthropicDelta::TextDelta { .. } | AnthropicDelta::ThinkingDelta { .. } => {
                UpstreamEvent::Unrecognized("content_block_delta(empty)".to_string())
            }
            AnthropicDelta::Other => UpstreamEvent::Unrecognized("content_block_delta".to_string()),
        },
        AnthropicStreamEvent::MessageStop {} => UpstreamEvent::MessageStop,
        AnthropicStreamEvent::Error { error } => {
            let message = if !error.message.is_empty() {
                error.message
            } else if !error.type_.is_empty() {
                error.type_
            } else {
                "Upstream stream error".to_string()
            };
            UpstreamEvent::UpstreamError(message)
        }
        AnthropicStreamEvent::MessageStart {} => {
            UpstreamEvent::Unrecognized("message_start".to_string())
        }
        AnthropicStreamEvent::ContentBlockStart {} => {
            UpstreamEvent::Unrecognized("content_block_start".to_string())
        }
        AnthropicStreamEvent::ContentBlockStop {} => {
            UpstreamEvent::Unrecognized("content_block_stop".to_string())
        }
        AnthropicStreamEvent::MessageDelta {} => {
            UpstreamEvent::Unrecognized("message_delta".to_string())
        }
        AnthropicStreamEvent::Ping {} => UpstreamEvent::Unrecognized("ping".to_string()),
        AnthropicStreamEvent::Other => {
            let kind = serde_json::from_str::<EventTypeOnly>(payload)
                .map(|tag| tag.type_)
                .unwrap_or_default();
            UpstreamEvent::Unrecognized(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_is_content() {
        let event = interpret_payload(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Here"}}"#,
        )
        .unwrap();
        assert_eq!(event, UpstreamEvent::ContentDelta("Here".to_string()));
    }

    #[test]
    fn thinking_delta_is_reasoning() {
        let event = interpret_payload(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
        )
        .unwrap();
        assert_eq!(event, UpstreamEvent::ReasoningDelta("hmm".to_string()));
    }

    #[test]
    fn empty_text_delta_is_dropped() {
        let event = interpret_payload(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":""}}"#,
        )
        .unwrap();
        assert!(matches!(event, UpstreamEvent::Unrecognized(_)));
    }

    #[test]
    fn tool_json_delta_is_unrecognized() {
        let event = interpret_payload(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            UpstreamEvent::Unrecognized("content_block_delta".to_string())
        );
    }

    #[test]
    fn message_stop_and_error() {
        assert_eq!(
            interpret_payload(r#"{"type":"message_stop"}"#).unwrap(),
            UpstreamEvent::MessageStop
        );
        assert_eq!(
            interpret_payload(
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
            )
            .unwrap(),
            UpstreamEvent::UpstreamError("Overloaded".to_string())
        );
    }

    #[test]
    fn known_bookkeeping_events_are_named() {
        let start = interpret_payload(
            r#"{"type":"message_start","message":{"id":"msg_1","type":"message","role":"assistant","model":"m","usage":{"input_tokens":3,"output_tokens":1}}}"#,
        )
        .unwrap();
        assert_eq!(start, UpstreamEvent::Unrecognized("message_start".to_string()));
        assert_eq!(
            interpret_payload(r#"{"type":"ping"}"#).unwrap(),
            UpstreamEvent::Unrecognized("ping".to_string())
        );
    }

    #[test]
    fn unknown_type_keeps_its_name() {
        assert_eq!(
            interpret_payload(r#"{"type":"citation_added","x":1}"#).unwrap(),
            UpstreamEvent::Unrecognized("citation_added".to_string())
        );
    }

    #[test]
    fn malformed_payload_is_decode_fault() {
        let err = interpret_payload(r#"{"type":"content_block_delta","delta":"#).unwrap_err();
        assert!(matches!(err, BridgeError::DecodeFault(_)));
        let err = interpret_payload("not json").unwrap_err();
        assert!(matches!(err, BridgeError::DecodeFault(_)));
    }
}
