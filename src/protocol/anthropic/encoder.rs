use crate::config::UpstreamConfig;
use crate::error::BridgeError;
use crate::protocol::anthropic::{AnthropicMessage, AnthropicRequest, AnthropicThinking};
use crate::protocol::canonical::{ChatRole, ChatTurn};
use crate::protocol::prompt::system_prompt;

/// Build the outbound Messages API request for one chat turn.
///
/// The configured steering suffix is appended to the final turn when it is a
/// user turn. Only the outbound copy changes; `turns` is left untouched.
/// With `reasoning` set and a thinking budget configured, extended thinking is
/// requested and `temperature` is omitted, since the provider only accepts
/// its default temperature with thinking enabled.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidInput`] when `turns` is empty.
pub fn encode_upstream_request(
    turns: &[ChatTurn],
    config: &UpstreamConfig,
    reasoning: bool,
) -> Result<AnthropicRequest, BridgeError> {
    if turns.is_empty() {
        return Err(BridgeError::InvalidInput(
            "Invalid messages format".to_string(),
        ));
    }

    let mut messages: Vec<AnthropicMessage> = turns
        .iter()
        .map(|turn| AnthropicMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect();

    if let (Some(suffix), Some(last)) = (config.steering_suffix.as_deref(), turns.last()) {
        if last.role == ChatRole::User {
            if let Some(outbound) = messages.last_mut() {
                outbound.content.push_str(suffix);
            }
        }
    }

    let thinking = config
        .thinking_budget_tokens
        .filter(|_| reasoning)
        .map(|budget_tokens| AnthropicThinking {
            type_: "enabled".to_string(),
            budget_tokens,
        });
    let temperature = if thinking.is_some() {
        None
    } else {
        Some(config.temperature)
    };

    Ok(AnthropicRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system: system_prompt(config.system_prompt.as_deref()).to_string(),
        messages,
        temperature,
        thinking,
        stream: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::prompt::DEFAULT_SYSTEM_PROMPT;

    #[test]
    fn builds_streaming_request_with_steering_suffix() {
        let turns = vec![ChatTurn::user("Design a cache")];
        let config = UpstreamConfig::default();
        let request = encode_upstream_request(&turns, &config, false).unwrap();

        assert_eq!(request.model, config.model);
        assert_eq!(request.max_tokens, 8192);
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.stream);
        assert!(request.thinking.is_none());
        assert_eq!(request.system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(
            request.messages,
            vec![AnthropicMessage {
                role: "user".to_string(),
                content: "Design a cache Do not ask any questions.".to_string(),
            }]
        );
        // The caller's conversation is not mutated.
        assert_eq!(turns[0].content, "Design a cache");
    }

    #[test]
    fn suffix_skipped_when_last_turn_is_assistant() {
        let turns = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let request = encode_upstream_request(&turns, &UpstreamConfig::default(), false).unwrap();
        assert_eq!(request.messages[0].content, "hi");
        assert_eq!(request.messages[1].content, "hello");
    }

    #[test]
    fn suffix_can_be_disabled() {
        let config = UpstreamConfig {
            steering_suffix: None,
            ..UpstreamConfig::default()
        };
        let request = encode_upstream_request(&[ChatTurn::user("hi")], &config, false).unwrap();
        assert_eq!(request.messages[0].content, "hi");
    }

    #[test]
    fn empty_conversation_is_invalid_input() {
        let err = encode_upstream_request(&[], &UpstreamConfig::default(), false).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidInput(_)));
    }

    #[test]
    fn reasoning_requests_thinking_when_budget_configured() {
        let config = UpstreamConfig {
            thinking_budget_tokens: Some(2048),
            ..UpstreamConfig::default()
        };
        let request = encode_upstream_request(&[ChatTurn::user("hi")], &config, true).unwrap();
        assert_eq!(
            request.thinking,
            Some(AnthropicThinking {
                type_: "enabled".to_string(),
                budget_tokens: 2048,
            })
        );
        assert!(request.temperature.is_none());

        let request = encode_upstream_request(&[ChatTurn::user("hi")], &config, false).unwrap();
        assert!(request.thinking.is_none());
    }

    #[test]
    fn serializes_to_messages_api_shape() {
        let request =
            encode_upstream_request(&[ChatTurn::user("hi")], &UpstreamConfig::default(), false)
                .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("thinking").is_none());
        assert_eq!(json["max_tokens"], 8192);
    }
}
