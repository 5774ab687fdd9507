//! Consumer side of the downstream wire format.
//!
//! [`TurnReader`] is what a browser client (or a test) runs over the chat
//! response body: it reassembles frames across chunk boundaries, accumulates
//! the assistant's text and tracks how the turn ended.

use std::ops::ControlFlow;

use crate::protocol::canonical::DownstreamFrame;
use crate::protocol::downstream::parse_frame_line;
use crate::segment::{segments, ResponseStats, Segments};
use crate::stream::LineBuffer;

const INCOMPLETE_STREAM_MESSAGE: &str = "stream ended before completion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Streaming,
    Completed,
    /// Terminal and shown to the user as-is; the turn is not retried.
    Failed { message: String },
}

#[derive(Debug, Default)]
pub struct TurnReader {
    lines: LineBuffer,
    text: String,
    reasoning: String,
    failure: Option<String>,
    done: bool,
}

impl TurnReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk. Frames after `Done` are ignored.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.done {
            return;
        }
        let Self {
            lines,
            text,
            reasoning,
            failure,
            done,
        } = self;
        let _ = lines.feed(chunk, |line| {
            let Some(frame) = std::str::from_utf8(line).ok().and_then(parse_frame_line) else {
                return ControlFlow::Continue(());
            };
            match frame {
                DownstreamFrame::TextDelta(delta) => text.push_str(&delta),
                DownstreamFrame::ReasoningDelta(delta) => reasoning.push_str(&delta),
                DownstreamFrame::ErrorFrame(message) => {
                    failure.get_or_insert(message);
                }
                DownstreamFrame::Done => {
                    *done = true;
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        });
        if self.done {
            self.lines.discard_pending();
        }
    }

    /// The body ended. A turn that never saw `Done` is marked failed.
    pub fn finish(&mut self) {
        if self.done {
            return;
        }
        self.lines.discard_pending();
        self.failure
            .get_or_insert_with(|| INCOMPLETE_STREAM_MESSAGE.to_string());
        self.done = true;
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn outcome(&self) -> TurnOutcome {
        match (&self.failure, self.done) {
            (Some(message), _) => TurnOutcome::Failed {
                message: message.clone(),
            },
            (None, true) => TurnOutcome::Completed,
            (None, false) => TurnOutcome::Streaming,
        }
    }

    /// Segments of the text received so far.
    #[must_use]
    pub fn segments(&self) -> Segments<'_> {
        segments(&self.text)
    }

    #[must_use]
    pub fn stats(&self) -> ResponseStats {
        ResponseStats::of(&self.text)
    }
}
