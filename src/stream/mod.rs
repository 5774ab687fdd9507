pub mod bridge;
pub mod lines;
pub mod sse;

pub use bridge::{TurnBridge, TurnPhase, UpstreamBody, UpstreamConnect};
pub use lines::LineBuffer;
pub use sse::{DecodedLine, SseLineDecoder};
