//! Splits assistant text into prose and Mermaid diagram segments.
//!
//! A diagram is written as
//!
//! ````text
//! ```mermaid title="Checkout flow" type="sequence"
//! sequenceDiagram
//!     A->>B: pay
//! ```
//! ````
//!
//! The segmenter is pure and cheap enough to re-run on every render pass
//! while text is still streaming in: for any text `T` and extension `T + U`,
//! every segment of `T` except the last is also a leading segment of `T + U`.

mod stats;

use std::ops::Range;
use std::sync::LazyLock;

use memchr::memmem;
use regex_lite::Regex;

pub use stats::ResponseStats;

const FENCE_OPEN: &str = "```mermaid";
const FENCE_CLOSE: &str = "\n```";

static FENCE_OPEN_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(FENCE_OPEN.as_bytes()));
static FENCE_CLOSE_FINDER: LazyLock<memmem::Finder<'static>> =
    LazyLock::new(|| memmem::Finder::new(FENCE_CLOSE.as_bytes()));
static FENCE_ATTRIBUTE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^\s+([A-Za-z][\w-]*)="([^"]*)""#).ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Prose,
    Diagram,
}

/// A contiguous piece of the source text.
///
/// `span` is the byte range of the source covered by this segment; spans of
/// consecutive segments are adjacent and together cover the whole text. For
/// prose `content` is exactly the spanned text, for diagrams it is the
/// trimmed body between the fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment<'a> {
    pub kind: SegmentKind,
    pub content: &'a str,
    pub title: Option<&'a str>,
    pub diagram_type: Option<&'a str>,
    pub span: Range<usize>,
}

impl<'a> TextSegment<'a> {
    fn prose(text: &'a str, span: Range<usize>) -> Self {
        Self {
            kind: SegmentKind::Prose,
            content: &text[span.clone()],
            title: None,
            diagram_type: None,
            span,
        }
    }

    #[must_use]
    pub fn is_diagram(&self) -> bool {
        self.kind == SegmentKind::Diagram
    }
}

/// Segment `text` lazily. Empty text yields nothing.
#[must_use]
pub fn segments(text: &str) -> Segments<'_> {
    Segments {
        text,
        pos: 0,
        queued: None,
    }
}

/// Iterator returned by [`segments`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
    queued: Option<TextSegment<'a>>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = TextSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(diagram) = self.queued.take() {
            return Some(diagram);
        }
        let len = self.text.len();
        if self.pos >= len {
            return None;
        }

        let start = self.pos;
        let mut search = start;
        while let Some(rel) = FENCE_OPEN_FINDER.find(&self.text.as_bytes()[search..]) {
            let fence_start = search + rel;
            if let Some(diagram) = parse_diagram(self.text, fence_start) {
                self.pos = diagram.span.end;
                if fence_start == start {
                    return Some(diagram);
                }
                self.queued = Some(diagram);
                return Some(TextSegment::prose(self.text, start..fence_start));
            }
            search = fence_start + 1;
        }

        self.pos = len;
        Some(TextSegment::prose(self.text, start..len))
    }
}

/// Parse a complete diagram whose opening fence starts at `start`.
///
/// `None` when the opening line is unfinished or malformed, or when no
/// closing fence follows; such text stays prose.
fn parse_diagram(text: &str, start: usize) -> Option<TextSegment<'_>> {
    let bytes = text.as_bytes();
    let attrs_start = start + FENCE_OPEN.len();
    let newline = attrs_start + memchr::memchr(b'\n', &bytes[attrs_start..])?;
    let opening = &text[attrs_start..newline];
    let opening = opening.strip_suffix('\r').unwrap_or(opening);
    let (title, diagram_type) = parse_attributes(opening)?;

    // The closing fence needs its own line after the opening one.
    let body_start = newline + 1;
    let close = body_start + FENCE_CLOSE_FINDER.find(&bytes[body_start..])?;
    let body = &text[body_start..close];
    let mut end = close + FENCE_CLOSE.len();
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }

    Some(TextSegment {
        kind: SegmentKind::Diagram,
        content: body.trim(),
        title,
        diagram_type,
        span: start..end,
    })
}

type FenceAttributes<'a> = (Option<&'a str>, Option<&'a str>);

fn parse_attributes(mut rest: &str) -> Option<FenceAttributes<'_>> {
    let pattern = FENCE_ATTRIBUTE.as_ref()?;
    let mut title = None;
    let mut diagram_type = None;
    while !rest.trim().is_empty() {
        let captures = pattern.captures(rest)?;
        let whole = captures.get(0)?;
        let name = captures.get(1)?.as_str();
        let value = captures.get(2)?.as_str();
        match name {
            "title" => title = Some(value),
            "type" => diagram_type = Some(value),
            _ => {}
        }
        rest = &rest[whole.end()..];
    }
    Some((title, diagram_type))
}
