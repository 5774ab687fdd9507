//! Side channel for turn-level observability.
//!
//! The bridge never logs directly; it reports [`TurnEvent`]s to an
//! [`EventRecorder`]. Production wires in [`TracingRecorder`], tests use
//! [`MemoryRecorder`] to assert on lifecycle transitions.

use parking_lot::Mutex;
use uuid::Uuid;

use crate::stream::bridge::TurnPhase;

/// Something worth recording about a single chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Phase { from: TurnPhase, to: TurnPhase },
    /// Outbound request body, only reported when payload logging is enabled.
    UpstreamRequest { body: String },
    /// A data line that could not be decoded or parsed; it was skipped.
    DecodeFault { reason: String },
    /// A provider event the bridge does not forward.
    Unrecognized { kind: String },
    /// Bytes left in the decode buffer without a line terminator at upstream end.
    TruncatedTail { bytes: usize },
    UpstreamFailure { message: String },
    /// The downstream consumer went away before the turn finished.
    Cancelled,
}

/// Receives [`TurnEvent`]s tagged with the turn id.
pub trait EventRecorder: Send + Sync {
    fn record(&self, turn_id: Uuid, event: TurnEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, turn_id: Uuid, event: TurnEvent) {
        match event {
            TurnEvent::Phase { from, to } => {
                tracing::debug!(turn = %turn_id, ?from, ?to, "turn phase changed");
            }
            TurnEvent::UpstreamRequest { body } => {
                tracing::debug!(turn = %turn_id, %body, "upstream request");
            }
            TurnEvent::DecodeFault { reason } => {
                tracing::warn!(turn = %turn_id, %reason, "skipping undecodable stream line");
            }
            TurnEvent::Unrecognized { kind } => {
                tracing::debug!(turn = %turn_id, %kind, "ignoring upstream event");
            }
            TurnEvent::TruncatedTail { bytes } => {
                tracing::warn!(turn = %turn_id, bytes, "upstream ended mid-line");
            }
            TurnEvent::UpstreamFailure { message } => {
                tracing::error!(turn = %turn_id, %message, "upstream failure");
            }
            TurnEvent::Cancelled => {
                tracing::info!(turn = %turn_id, "client disconnected, upstream aborted");
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<(Uuid, TurnEvent)>>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TurnEvent> {
        self.events
            .lock()
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Phases entered, in order.
    #[must_use]
    pub fn phases(&self) -> Vec<TurnPhase> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, event)| match event {
                TurnEvent::Phase { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, turn_id: Uuid, event: TurnEvent) {
        self.events.lock().push((turn_id, event));
    }
}
