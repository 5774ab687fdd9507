//! SSE data-line decoder for the provider stream.
//!
//! Only `data:` lines matter to the bridge; `event:`, `id:`, comments and the
//! blank lines separating SSE events are skipped. The explicit `[DONE]`
//! sentinel ends decoding for good.
use std::ops::ControlFlow;

use super::lines::LineBuffer;

const DATA_PREFIX: &[u8] = b"data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One complete line's worth of decoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// Payload of a `data:` line, one optional leading space removed.
    Data(String),
    /// The end-of-stream sentinel.
    Done,
    /// A `data:` line whose payload is not valid UTF-8.
    Malformed { reason: String },
}

/// Incremental decoder from raw provider bytes to [`DecodedLine`]s.
///
/// Chunk boundaries are transparent: feeding the concatenation of all chunks
/// at once yields the same sequence as feeding them one by one.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    lines: LineBuffer,
    finished: bool,
}

impl SseLineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return any complete lines decoded.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw bytes and append decoded lines into a caller-provided buffer.
    ///
    /// After the sentinel has been seen this is a no-op.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<DecodedLine>) {
        if self.finished {
            return;
        }
        let flow = self.lines.feed(chunk, |line| decode_line(line, out));
        if flow.is_break() {
            self.finished = true;
            self.lines.discard_pending();
        }
    }

    /// Whether the `[DONE]` sentinel has been decoded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Upstream ended: drop any unterminated tail and return its length.
    pub fn finish(&mut self) -> usize {
        self.finished = true;
        self.lines.discard_pending()
    }
}

fn decode_line(line: &[u8], out: &mut Vec<DecodedLine>) -> ControlFlow<()> {
    let Some(value) = line.strip_prefix(DATA_PREFIX) else {
        return ControlFlow::Continue(());
    };
    let value = value.strip_prefix(b" ").unwrap_or(value);
    match std::str::from_utf8(value) {
        Ok(payload) if payload.trim() == DONE_SENTINEL => {
            out.push(DecodedLine::Done);
            ControlFlow::Break(())
        }
        Ok(payload) => {
            out.push(DecodedLine::Data(payload.to_owned()));
            ControlFlow::Continue(())
        }
        Err(err) => {
            out.push(DecodedLine::Malformed {
                reason: format!("data line is not valid UTF-8: {err}"),
            });
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(payload: &str) -> DecodedLine {
        DecodedLine::Data(payload.to_string())
    }

    #[test]
    fn test_parse_simple_data_line() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.feed(b"data: hello world\n"), vec![data("hello world")]);
    }

    #[test]
    fn test_named_events_and_blank_lines_are_skipped() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.feed(
            b"event: message_start\ndata: {\"type\":\"message_start\"}\n\n: keepalive\nid: 4\n",
        );
        assert_eq!(lines, vec![data("{\"type\":\"message_start\"}")]);
    }

    #[test]
    fn test_data_no_space_after_colon() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.feed(b"data:nospace\n"), vec![data("nospace")]);
    }

    #[test]
    fn test_incremental_chunks() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.feed(b"data: hel").is_empty());
        assert_eq!(decoder.feed(b"lo\r\n"), vec![data("hello")]);
    }

    #[test]
    fn test_done_sentinel_stops_decoding() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.feed(b"data: a\ndata: [DONE]\ndata: b\n");
        assert_eq!(lines, vec![data("a"), DecodedLine::Done]);
        assert!(decoder.is_finished());
        assert!(decoder.feed(b"data: c\n").is_empty());
    }

    #[test]
    fn test_done_sentinel_tolerates_whitespace() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.feed(b"data:  [DONE] \n"), vec![DecodedLine::Done]);
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed_and_stream_continues() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.feed(b"data: \xff\xfe\ndata: ok\n");
        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[0], DecodedLine::Malformed { .. }));
        assert_eq!(lines[1], data("ok"));
    }

    #[test]
    fn test_finish_reports_unterminated_tail() {
        let mut decoder = SseLineDecoder::new();
        assert_eq!(decoder.feed(b"data: full\ndata: {\"par"), vec![data("full")]);
        assert_eq!(decoder.finish(), 11);
        assert!(decoder.feed(b"tial\"}\n").is_empty());
    }

    #[test]
    fn test_chunk_boundaries_are_transparent() {
        let input = "event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"h\u{e9}llo \u{1f600}\"}}\n\
\n\
data: {\"type\":\"ping\"}\r\n\
\r\n\
data: {\"type\":\"message_stop\"}\n\
\n\
data: [DONE]\n\
data: ignored\n";
        let bytes = input.as_bytes();
        let expected = SseLineDecoder::new().feed(bytes);
        assert_eq!(expected.len(), 4);

        for split in 0..=bytes.len() {
            let mut decoder = SseLineDecoder::new();
            let mut lines = decoder.feed(&bytes[..split]);
            lines.extend(decoder.feed(&bytes[split..]));
            assert_eq!(lines, expected, "split at {split}");
        }

        for first in (0..bytes.len()).step_by(7) {
            for second in (first..=bytes.len()).step_by(5) {
                let mut decoder = SseLineDecoder::new();
                let mut lines = decoder.feed(&bytes[..first]);
                lines.extend(decoder.feed(&bytes[first..second]));
                lines.extend(decoder.feed(&bytes[second..]));
                assert_eq!(lines, expected, "splits at {first}/{second}");
            }
        }

        let mut decoder = SseLineDecoder::new();
        let mut lines = Vec::new();
        for byte in bytes {
            decoder.feed_into(std::slice::from_ref(byte), &mut lines);
        }
        assert_eq!(lines, expected);
    }
}
