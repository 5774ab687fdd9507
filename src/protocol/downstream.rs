//! Downstream wire format consumed by the browser.
//!
//! One frame per line, `<channel>:<json>\n`:
//!
//! ```text
//! 0:{"type":"text-delta","textDelta":"Here"}
//! g:{"type":"reasoning-delta","reasoningDelta":"..."}
//! 3:{"type":"error","error":"..."}
//! data: [DONE]
//! ```
//!
//! The terminal marker keeps the blank line after it so SSE-aware readers
//! also see it as a complete event.

use bytes::Bytes;
use serde::Deserialize;

use crate::protocol::canonical::{DownstreamFrame, UpstreamEvent};
use crate::util::push_json_string_escaped;

pub const TEXT_CHANNEL: &str = "0";
pub const REASONING_CHANNEL: &str = "g";
pub const ERROR_CHANNEL: &str = "3";

const DONE_LINE: &str = "data: [DONE]";
const DONE_FRAME: &str = "data: [DONE]\n\n";

/// What a frame encoder needs to know about the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOptions {
    pub expose_reasoning: bool,
}

/// Map an interpreted upstream event to the frame it produces, if any.
#[must_use]
pub fn frame_for_event(event: UpstreamEvent, options: FrameOptions) -> Option<DownstreamFrame> {
    match event {
        UpstreamEvent::ContentDelta(text) => Some(DownstreamFrame::TextDelta(text)),
        UpstreamEvent::ReasoningDelta(text) => options
            .expose_reasoning
            .then_some(DownstreamFrame::ReasoningDelta(text)),
        UpstreamEvent::MessageStop => Some(DownstreamFrame::Done),
        UpstreamEvent::UpstreamError(message) => Some(DownstreamFrame::ErrorFrame(message)),
        UpstreamEvent::Unrecognized(_) => None,
    }
}

/// Encode a frame as wire text.
#[must_use]
pub fn encode_frame(frame: &DownstreamFrame) -> String {
    match frame {
        DownstreamFrame::TextDelta(text) => {
            tagged_line(TEXT_CHANNEL, "text-delta", "textDelta", text)
        }
        DownstreamFrame::ReasoningDelta(text) => {
            tagged_line(REASONING_CHANNEL, "reasoning-delta", "reasoningDelta", text)
        }
        DownstreamFrame::ErrorFrame(message) => {
            tagged_line(ERROR_CHANNEL, "error", "error", message)
        }
        DownstreamFrame::Done => DONE_FRAME.to_owned(),
    }
}

/// Encode a frame as a body chunk.
#[must_use]
pub fn encode_frame_bytes(frame: &DownstreamFrame) -> Bytes {
    match frame {
        DownstreamFrame::Done => Bytes::from_static(DONE_FRAME.as_bytes()),
        other => Bytes::from(encode_frame(other)),
    }
}

fn tagged_line(channel: &str, type_: &str, field: &str, value: &str) -> String {
    let mut out = String::with_capacity(channel.len() + type_.len() + field.len() + value.len() + 24);
    out.push_str(channel);
    out.push_str(":{\"type\":\"");
    out.push_str(type_);
    out.push_str("\",\"");
    out.push_str(field);
    out.push_str("\":");
    push_json_string_escaped(&mut out, value);
    out.push_str("}\n");
    out
}

#[derive(Deserialize)]
struct TextDeltaPayload {
    #[serde(rename = "textDelta")]
    text_delta: String,
}

#[derive(Deserialize)]
struct ReasoningDeltaPayload {
    #[serde(rename = "reasoningDelta")]
    reasoning_delta: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Parse one downstream line (without its terminator) back into a frame.
///
/// Returns `None` for blank lines, unknown channels and malformed payloads.
#[must_use]
pub fn parse_frame_line(line: &str) -> Option<DownstreamFrame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim() == DONE_LINE {
        return Some(DownstreamFrame::Done);
    }
    let (channel, payload) = line.split_once(':')?;
    match channel {
        TEXT_CHANNEL => serde_json::from_str::<TextDeltaPayload>(payload)
            .ok()
            .map(|p| DownstreamFrame::TextDelta(p.text_delta)),
        REASONING_CHANNEL => serde_json::from_str::<ReasoningDeltaPayload>(payload)
            .ok()
            .map(|p| DownstreamFrame::ReasoningDelta(p.reasoning_delta)),
        ERROR_CHANNEL => serde_json::from_str::<ErrorPayload>(payload)
            .ok()
            .map(|p| DownstreamFrame::ErrorFrame(p.error)),
        _ => None,
    }
}
