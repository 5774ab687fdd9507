use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use archchat::client::TurnReader;
use archchat::observability::{EventRecorder, TurnEvent};
use archchat::protocol::canonical::DownstreamFrame;
use archchat::protocol::downstream::{encode_frame, FrameOptions};
use archchat::segment::{segments, ResponseStats};
use archchat::stream::{SseLineDecoder, TurnBridge};
use uuid::Uuid;

struct NoopRecorder;

impl EventRecorder for NoopRecorder {
    fn record(&self, _turn_id: Uuid, _event: TurnEvent) {}
}

fn provider_stream(deltas: usize) -> Vec<u8> {
    let mut out = String::from(
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"type\":\"message\",\"role\":\"assistant\",\"content\":[]}}\n\n",
    );
    for idx in 0..deltas {
        out.push_str("event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"token ");
        out.push_str(&idx.to_string());
        out.push_str(" \\\"quoted\\\"\\n\"}}\n\n");
        if idx % 50 == 0 {
            out.push_str("event: ping\ndata: {\"type\":\"ping\"}\n\n");
        }
    }
    out.push_str("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
    out.into_bytes()
}

fn architect_answer(sections: usize) -> String {
    let mut out = String::new();
    for idx in 0..sections {
        out.push_str("The ingestion tier buffers writes before they reach storage. ");
        out.push_str("Each shard owns a contiguous key range.\n\n");
        out.push_str("```mermaid title=\"Section ");
        out.push_str(&idx.to_string());
        out.push_str("\" type=\"flowchart\"\ngraph TD\n  Client-->Gateway\n  Gateway-->Shard\n```\n");
    }
    out
}

fn bench_sse_decoder(c: &mut Criterion) {
    let input = provider_stream(500);

    c.bench_function("sse_decode_500_deltas_512b_chunks", |b| {
        b.iter(|| {
            let mut decoder = SseLineDecoder::new();
            let mut lines = Vec::with_capacity(16);
            let mut total = 0usize;
            for chunk in input.chunks(512) {
                decoder.feed_into(black_box(chunk), &mut lines);
                total += lines.len();
                lines.clear();
            }
            black_box(total)
        });
    });

    c.bench_function("sse_decode_500_deltas_single_chunk", |b| {
        b.iter(|| black_box(SseLineDecoder::new().feed(black_box(&input)).len()));
    });
}

fn bench_turn_bridge(c: &mut Criterion) {
    let input = provider_stream(500);
    let recorder: Arc<dyn EventRecorder> = Arc::new(NoopRecorder);

    c.bench_function("turn_bridge_500_deltas_512b_chunks", |b| {
        b.iter(|| {
            let mut bridge = TurnBridge::new(
                Uuid::from_u128(1),
                Arc::clone(&recorder),
                FrameOptions::default(),
            );
            bridge.request_sent();
            let mut bytes_out = 0usize;
            for chunk in input.chunks(512) {
                bridge.on_chunk(black_box(chunk));
                while let Some(frame) = bridge.next_chunk() {
                    bytes_out += frame.len();
                }
            }
            bridge.close();
            black_box(bytes_out)
        });
    });
}

fn bench_frame_encoding(c: &mut Criterion) {
    let plain = DownstreamFrame::TextDelta("The gateway fans requests out to shards.".to_string());
    let escaped = DownstreamFrame::TextDelta("line one\n\"quoted\"\tand\\slashes\n".to_string());

    c.bench_function("encode_text_delta_plain", |b| {
        b.iter(|| black_box(encode_frame(black_box(&plain))));
    });
    c.bench_function("encode_text_delta_escaped", |b| {
        b.iter(|| black_box(encode_frame(black_box(&escaped))));
    });
}

fn bench_segmenter(c: &mut Criterion) {
    let answer = architect_answer(40);

    c.bench_function("segment_40_diagrams", |b| {
        b.iter(|| black_box(segments(black_box(&answer)).count()));
    });

    c.bench_function("response_stats_40_sections", |b| {
        b.iter(|| black_box(ResponseStats::of(black_box(&answer))));
    });

    let wire: String = answer
        .as_bytes()
        .chunks(24)
        .map(|piece| encode_frame(&DownstreamFrame::TextDelta(String::from_utf8_lossy(piece).into_owned())))
        .chain(std::iter::once(encode_frame(&DownstreamFrame::Done)))
        .collect();
    c.bench_function("turn_reader_feed_and_segment", |b| {
        b.iter(|| {
            let mut reader = TurnReader::new();
            for chunk in wire.as_bytes().chunks(256) {
                reader.feed(black_box(chunk));
            }
            black_box(reader.segments().count())
        });
    });
}

criterion_group!(
    benches,
    bench_sse_decoder,
    bench_turn_bridge,
    bench_frame_encoding,
    bench_segmenter
);
criterion_main!(benches);
