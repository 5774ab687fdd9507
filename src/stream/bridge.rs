//! Per-turn lifecycle: drives one provider stream into downstream frames.
//!
//! [`TurnBridge`] is the synchronous state machine. It owns the decoder and
//! the queue of encoded frames and knows nothing about I/O, so it can be
//! driven chunk by chunk in tests. [`TurnBridge::into_body_stream`] wraps it
//! in an `unfold` stream that owns the upstream connection and enforces the
//! turn deadline.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::error::BridgeError;
use crate::observability::{EventRecorder, TurnEvent};
use crate::protocol::anthropic::stream::interpret_payload;
use crate::protocol::canonical::{DownstreamFrame, UpstreamEvent};
use crate::protocol::downstream::{encode_frame_bytes, frame_for_event, FrameOptions};
use crate::stream::sse::{DecodedLine, SseLineDecoder};
use crate::util::truncate_for_log;

const LOG_PAYLOAD_MAX_BYTES: usize = 256;

/// Body of an upstream streaming response.
pub type UpstreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, BridgeError>> + Send>>;

/// Pending upstream connection, resolving once response headers arrived.
pub type UpstreamConnect =
    Pin<Box<dyn Future<Output = Result<UpstreamBody, BridgeError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    RequestSent,
    Streaming,
    Completed,
    Failed,
    Closed,
}

struct PendingChunks {
    chunks: SmallVec<[Bytes; 8]>,
    head: usize,
}

impl PendingChunks {
    fn new() -> Self {
        Self {
            chunks: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn push(&mut self, chunk: Bytes) {
        self.chunks.push(chunk);
    }

    #[inline]
    fn pop_front(&mut self) -> Option<Bytes> {
        if self.head >= self.chunks.len() {
            return None;
        }
        let chunk = std::mem::take(&mut self.chunks[self.head]);
        self.head += 1;
        if self.head == self.chunks.len() {
            self.chunks.clear();
            self.head = 0;
        }
        Some(chunk)
    }
}

/// State machine for a single chat turn.
///
/// Exactly one `Done` frame is queued per turn and it is always the last
/// frame. Once the turn is terminal every further input is ignored.
pub struct TurnBridge {
    turn_id: Uuid,
    phase: TurnPhase,
    recorder: Arc<dyn EventRecorder>,
    decoder: SseLineDecoder,
    decoded: Vec<DecodedLine>,
    pending: PendingChunks,
    options: FrameOptions,
}

impl TurnBridge {
    #[must_use]
    pub fn new(turn_id: Uuid, recorder: Arc<dyn EventRecorder>, options: FrameOptions) -> Self {
        Self {
            turn_id,
            phase: TurnPhase::Idle,
            recorder,
            decoder: SseLineDecoder::new(),
            decoded: Vec::with_capacity(8),
            pending: PendingChunks::new(),
            options,
        }
    }

    #[must_use]
    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Completed, Failed or Closed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            TurnPhase::Completed | TurnPhase::Failed | TurnPhase::Closed
        )
    }

    pub fn request_sent(&mut self) {
        if self.phase == TurnPhase::Idle {
            self.transition(TurnPhase::RequestSent);
        }
    }

    /// Feed one raw upstream chunk.
    pub fn on_chunk(&mut self, chunk: &[u8]) {
        if self.is_terminal() {
            return;
        }
        if self.phase != TurnPhase::Streaming {
            self.transition(TurnPhase::Streaming);
        }

        let mut decoded = std::mem::take(&mut self.decoded);
        self.decoder.feed_into(chunk, &mut decoded);
        for line in decoded.drain(..) {
            if self.is_terminal() {
                break;
            }
            match line {
                DecodedLine::Data(payload) => match interpret_payload(&payload) {
                    Ok(event) => self.on_event(event),
                    Err(err) => self.record(TurnEvent::DecodeFault {
                        reason: format!(
                            "{err}; payload={}",
                            truncate_for_log(&payload, LOG_PAYLOAD_MAX_BYTES)
                        ),
                    }),
                },
                DecodedLine::Done => self.complete(),
                DecodedLine::Malformed { reason } => {
                    self.record(TurnEvent::DecodeFault { reason });
                }
            }
        }
        self.decoded = decoded;
    }

    /// Apply one interpreted upstream event.
    pub fn on_event(&mut self, event: UpstreamEvent) {
        if self.is_terminal() {
            return;
        }
        if let UpstreamEvent::Unrecognized(kind) = &event {
            self.record(TurnEvent::Unrecognized { kind: kind.clone() });
        }
        match frame_for_event(event, self.options) {
            Some(DownstreamFrame::Done) => self.complete(),
            Some(DownstreamFrame::ErrorFrame(message)) => self.fail_with_message(message),
            Some(frame) => self.push(&frame),
            None => {}
        }
    }

    /// Upstream body ended without an explicit stop.
    pub fn on_upstream_end(&mut self) {
        if self.is_terminal() {
            return;
        }
        let tail = self.decoder.finish();
        if tail > 0 {
            self.record(TurnEvent::TruncatedTail { bytes: tail });
        }
        self.complete();
    }

    /// Fail the turn in-band: an error frame followed by `Done`.
    pub fn fail(&mut self, err: &BridgeError) {
        self.fail_with_message(err.client_message());
    }

    pub fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.push(&DownstreamFrame::Done);
        self.transition(TurnPhase::Completed);
    }

    /// Next encoded frame, in emission order.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        self.pending.pop_front()
    }

    /// Latch the turn closed. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.phase == TurnPhase::Closed {
            return;
        }
        if !self.is_terminal() {
            self.record(TurnEvent::Cancelled);
        }
        self.transition(TurnPhase::Closed);
    }

    /// Turn the bridge into a downstream body stream.
    ///
    /// `connect` covers request dispatch up to response headers; the turn
    /// enters `RequestSent` when it is first polled. The deadline starts now
    /// and covers both connecting and streaming; when it expires the turn
    /// fails. Dropping the returned stream drops the upstream
    /// response, which aborts the request, and closes the turn.
    pub fn into_body_stream(
        self,
        connect: UpstreamConnect,
        max_duration: Duration,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let driver = TurnDriver {
            bridge: self,
            upstream: Upstream::Connecting(connect),
            deadline: turn_deadline(tokio::time::Instant::now(), max_duration),
            max_duration,
        };

        futures_util::stream::unfold(driver, |mut driver| async move {
            loop {
                if driver.bridge.is_terminal() {
                    driver.upstream = Upstream::Gone;
                }
                if let Some(chunk) = driver.bridge.next_chunk() {
                    return Some((Ok::<_, Infallible>(chunk), driver));
                }
                if driver.bridge.is_terminal() {
                    driver.bridge.close();
                    return None;
                }
                driver.advance().await;
            }
        })
    }

    fn fail_with_message(&mut self, message: String) {
        if self.is_terminal() {
            return;
        }
        self.record(TurnEvent::UpstreamFailure {
            message: message.clone(),
        });
        self.push(&DownstreamFrame::ErrorFrame(message));
        self.push(&DownstreamFrame::Done);
        self.transition(TurnPhase::Failed);
    }

    fn push(&mut self, frame: &DownstreamFrame) {
        self.pending.push(encode_frame_bytes(frame));
    }

    fn transition(&mut self, to: TurnPhase) {
        let from = self.phase;
        self.phase = to;
        self.record(TurnEvent::Phase { from, to });
    }

    fn record(&self, event: TurnEvent) {
        self.recorder.record(self.turn_id, event);
    }
}

impl Drop for TurnBridge {
    fn drop(&mut self) {
        self.close();
    }
}

/// Far enough out to never fire during a turn, small enough to add to any
/// `Instant` without overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn turn_deadline(now: tokio::time::Instant, max_duration: Duration) -> tokio::time::Instant {
    now.checked_add(max_duration)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

enum Upstream {
    Connecting(UpstreamConnect),
    Open(UpstreamBody),
    Gone,
}

struct TurnDriver {
    bridge: TurnBridge,
    upstream: Upstream,
    deadline: tokio::time::Instant,
    max_duration: Duration,
}

impl TurnDriver {
    async fn advance(&mut self) {
        match std::mem::replace(&mut self.upstream, Upstream::Gone) {
            Upstream::Connecting(connect) => {
                self.bridge.request_sent();
                match tokio::time::timeout_at(self.deadline, connect).await {
                    Ok(Ok(body)) => self.upstream = Upstream::Open(body),
                    Ok(Err(err)) => self.bridge.fail(&err),
                    Err(_) => self.fail_deadline(),
                }
            }
            Upstream::Open(mut body) => {
                match tokio::time::timeout_at(self.deadline, body.next()).await {
                    Ok(Some(Ok(chunk))) => {
                        self.bridge.on_chunk(&chunk);
                        self.upstream = Upstream::Open(body);
                    }
                    Ok(Some(Err(err))) => self.bridge.fail(&err),
                    Ok(None) => self.bridge.on_upstream_end(),
                    Err(_) => self.fail_deadline(),
                }
            }
            Upstream::Gone => self.bridge.on_upstream_end(),
        }
    }

    fn fail_deadline(&mut self) {
        let err = BridgeError::UpstreamTransport(format!(
            "Response did not complete within {}s",
            self.max_duration.as_secs()
        ));
        self.bridge.fail(&err);
    }
}
