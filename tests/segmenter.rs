use archchat::segment::{segments, SegmentKind, TextSegment};

const FIXTURES: &[&str] = &[
    "Intro text\n```mermaid\ngraph TD; A-->B\n```\nOutro text",
    "Plain answer with no diagrams at all.",
    "```mermaid title=\"Write path\" type=\"sequence\"\nsequenceDiagram\n  C->>S: put\n```\nThen:\n\n```mermaid\ngraph LR\n  S-->DB\n```",
    "Broken ```mermaid fence that never closes\ngraph TD; X-->Y",
    "Some code:\n```rust\nfn main() {}\n```\nand a diagram\n```mermaid type=\"flowchart\"\nA-->B\n```\n\u{e9}nd \u{1f600}",
    "```mermaid\n\n```\nempty diagram above",
    "```mermaid\n```\nno body line, so no diagram",
];

fn collect(text: &str) -> Vec<TextSegment<'_>> {
    segments(text).collect()
}

#[test]
fn test_intro_diagram_outro() {
    let segs = collect(FIXTURES[0]);
    let summary: Vec<_> = segs.iter().map(|seg| (seg.kind, seg.content)).collect();
    assert_eq!(
        summary,
        vec![
            (SegmentKind::Prose, "Intro text\n"),
            (SegmentKind::Diagram, "graph TD; A-->B"),
            (SegmentKind::Prose, "Outro text"),
        ]
    );
}

#[test]
fn test_spans_reconstruct_text() {
    for text in FIXTURES {
        let segs = collect(text);
        let mut cursor = 0;
        let mut rebuilt = String::new();
        for seg in &segs {
            assert_eq!(seg.span.start, cursor, "gap or overlap in {text:?}");
            assert!(seg.span.end > seg.span.start, "empty segment in {text:?}");
            rebuilt.push_str(&text[seg.span.clone()]);
            if seg.kind == SegmentKind::Prose {
                assert_eq!(seg.content, &text[seg.span.clone()]);
            }
            cursor = seg.span.end;
        }
        assert_eq!(rebuilt, *text);
    }
}

#[test]
fn test_prose_never_adjacent() {
    for text in FIXTURES {
        let segs = collect(text);
        for pair in segs.windows(2) {
            assert!(
                pair[0].kind == SegmentKind::Diagram || pair[1].kind == SegmentKind::Diagram,
                "adjacent prose in {text:?}"
            );
        }
    }
}

#[test]
fn test_titles_and_types() {
    let diagrams: Vec<_> = collect(FIXTURES[2])
        .into_iter()
        .filter(TextSegment::is_diagram)
        .collect();
    assert_eq!(diagrams.len(), 2);
    assert_eq!(diagrams[0].title, Some("Write path"));
    assert_eq!(diagrams[0].diagram_type, Some("sequence"));
    assert_eq!(diagrams[0].content, "sequenceDiagram\n  C->>S: put");
    assert_eq!(diagrams[1].title, None);
    assert_eq!(diagrams[1].content, "graph LR\n  S-->DB");
}

#[test]
fn test_unterminated_fence_stays_prose() {
    let segs = collect(FIXTURES[3]);
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].kind, SegmentKind::Prose);
}

#[test]
fn test_other_code_fences_are_prose() {
    let segs = collect(FIXTURES[4]);
    assert_eq!(segs.len(), 3);
    assert!(segs[0].content.contains("```rust"));
    assert_eq!(segs[1].diagram_type, Some("flowchart"));
    assert_eq!(segs[2].content, "\u{e9}nd \u{1f600}");
}

#[test]
fn test_closing_fence_needs_its_own_line() {
    let empty = collect(FIXTURES[5]);
    assert_eq!(empty.len(), 2);
    assert!(empty[0].is_diagram());
    assert_eq!(empty[0].content, "");

    let squashed = collect(FIXTURES[6]);
    assert_eq!(squashed.len(), 1);
    assert_eq!(squashed[0].kind, SegmentKind::Prose);
}

#[test]
fn test_segments_are_stable_while_streaming() {
    for text in FIXTURES {
        let full = collect(text);
        for end in (0..=text.len()).filter(|end| text.is_char_boundary(*end)) {
            let prefix = &text[..end];
            let partial = collect(prefix);
            if partial.len() < 2 {
                continue;
            }
            let settled = &partial[..partial.len() - 1];
            assert!(
                full.len() >= settled.len(),
                "prefix {prefix:?} produced more settled segments than the full text"
            );
            assert_eq!(&full[..settled.len()], settled, "prefix {prefix:?}");
        }
    }
}

#[test]
fn test_segmenter_is_restartable() {
    for text in FIXTURES {
        assert_eq!(collect(text), collect(text));
    }
}
