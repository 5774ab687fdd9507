use std::ops::ControlFlow;

use memchr::memchr_iter;

const COMPACT_THRESHOLD_BYTES: usize = 8 * 1024;

/// Incremental splitter of a byte stream into `\n`-terminated lines.
///
/// Chunks may end anywhere, including inside a line or inside a multi-byte
/// UTF-8 sequence. Complete lines are handed to the callback without their
/// terminator (a trailing `\r` is stripped as well); the unterminated tail
/// stays buffered until a later chunk completes it. Bytes before
/// `read_offset` are consumed and are dropped lazily; bytes between
/// `read_offset` and `scanned` are known to hold no `\n`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    read_offset: usize,
    scanned: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and hand every newly completed line to `on_line`.
    ///
    /// Stops early, leaving unvisited lines buffered, when `on_line` returns
    /// `ControlFlow::Break`.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_line: F) -> ControlFlow<()>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let scan_start = self.scanned;
        self.buffer.extend_from_slice(chunk);

        let mut line_start = self.read_offset;
        let mut flow = ControlFlow::Continue(());
        for rel_pos in memchr_iter(b'\n', &self.buffer[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[line_start..line_end];
            if let [head @ .., b'\r'] = line {
                line = head;
            }
            line_start = line_end + 1;
            if on_line(line).is_break() {
                flow = ControlFlow::Break(());
                break;
            }
        }

        self.read_offset = line_start;
        self.scanned = if flow.is_break() {
            line_start
        } else {
            self.buffer.len()
        };
        self.compact();
        flow
    }

    /// Number of buffered bytes that do not yet form a complete line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    /// Drop the unterminated tail, returning how many bytes were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let pending = self.pending_len();
        self.buffer.clear();
        self.read_offset = 0;
        self.scanned = 0;
        pending
    }

    fn compact(&mut self) {
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            self.scanned = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2
                || self.read_offset >= COMPACT_THRESHOLD_BYTES);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.scanned -= self.read_offset;
            self.read_offset = 0;
        }
    }
}
