use std::convert::Infallible;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpListener;

const DEFAULT_UPSTREAM_PORT: u16 = 19_002;
const DELTA_TARGET_BYTES: usize = 12;

type MockBody = UnsyncBoxBody<Bytes, std::io::Error>;

#[derive(Copy, Clone)]
enum MockScenario {
    /// Architect answer with prose and a Mermaid diagram.
    Text,
    /// Thinking deltas before the answer.
    Reasoning,
    /// 401 with an Anthropic error body.
    Unauthorized,
    /// In-stream `overloaded_error` after a few deltas.
    Overloaded,
    /// Connection dropped after a few deltas.
    Reset,
}

impl MockScenario {
    fn name(self) -> &'static str {
        match self {
            MockScenario::Text => "text",
            MockScenario::Reasoning => "reasoning",
            MockScenario::Unauthorized => "unauthorized",
            MockScenario::Overloaded => "overloaded",
            MockScenario::Reset => "reset",
        }
    }
}

struct MockState {
    scenario: MockScenario,
    delay: Duration,
    requests: AtomicU64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let port = env_u16("UPSTREAM_PORT", DEFAULT_UPSTREAM_PORT);
    let state = Arc::new(MockState {
        scenario: parse_scenario(),
        delay: Duration::from_millis(env_u64("MOCK_DELAY_MS", 0)),
        requests: AtomicU64::new(0),
    });

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap_or_else(|err| panic!("failed to bind mock upstream on 127.0.0.1:{port}: {err}"));
    eprintln!(
        "mock anthropic upstream on 127.0.0.1:{port} (scenario={}, delay={}ms)",
        state.scenario.name(),
        state.delay.as_millis()
    );

    let conn_builder = AutoBuilder::new(TokioExecutor::new());
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok((stream, remote_addr)) => (stream, remote_addr),
            Err(err) => {
                eprintln!("accept error: {err}");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let conn_builder = conn_builder.clone();
        let service_state = Arc::clone(&state);
        let service = service_fn(move |request: Request<Incoming>| {
            let state_ref = Arc::clone(&service_state);
            async move { Ok::<_, Infallible>(handle_request(request, &state_ref).await) }
        });

        tokio::spawn(async move {
            if let Err(err) = conn_builder.serve_connection(io, service).await {
                eprintln!("mock upstream connection error from {remote_addr}: {err}");
            }
        });
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_scenario() -> MockScenario {
    match env::var("MOCK_SCENARIO").as_deref() {
        Ok("reasoning") => MockScenario::Reasoning,
        Ok("unauthorized") => MockScenario::Unauthorized,
        Ok("overloaded") => MockScenario::Overloaded,
        Ok("reset") => MockScenario::Reset,
        Ok("text") | Err(_) => MockScenario::Text,
        Ok(other) => {
            eprintln!("unknown MOCK_SCENARIO '{other}', fallback to text");
            MockScenario::Text
        }
    }
}

async fn handle_request(request: Request<Incoming>, state: &MockState) -> Response<MockBody> {
    let (parts, body) = request.into_parts();
    let request_body = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    let path = parts.uri.path();

    if parts.method == Method::GET && path == "/_mock/stats" {
        let body = format!(
            "{{\"scenario\":\"{}\",\"requests\":{}}}",
            state.scenario.name(),
            state.requests.load(Ordering::Relaxed)
        );
        return full_response(StatusCode::OK, "application/json", Bytes::from(body));
    }
    if path != "/v1/messages" {
        return full_response(
            StatusCode::NOT_FOUND,
            "application/json",
            Bytes::from_static(br#"{"type":"error","error":{"type":"not_found_error","message":"Not found"}}"#),
        );
    }
    if parts.method != Method::POST {
        return full_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "application/json",
            Bytes::from_static(br#"{"type":"error","error":{"type":"invalid_request_error","message":"Method not allowed"}}"#),
        );
    }
    state.requests.fetch_add(1, Ordering::Relaxed);

    if !parts.headers.contains_key("x-api-key") {
        return unauthorized();
    }
    if !is_streaming_request(&request_body) {
        return full_response(
            StatusCode::BAD_REQUEST,
            "application/json",
            Bytes::from_static(br#"{"type":"error","error":{"type":"invalid_request_error","message":"mock only serves stream=true"}}"#),
        );
    }

    match state.scenario {
        MockScenario::Unauthorized => unauthorized(),
        MockScenario::Text => streaming_response(text_events(false), None, state.delay),
        MockScenario::Reasoning => streaming_response(text_events(true), None, state.delay),
        MockScenario::Overloaded => {
            let mut events = text_events(false);
            events.truncate(6);
            events.push(sse_event(
                "error",
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            ));
            streaming_response(events, None, state.delay)
        }
        MockScenario::Reset => {
            let mut events = text_events(false);
            events.truncate(6);
            streaming_response(events, Some("connection reset by mock"), state.delay)
        }
    }
}

fn is_streaming_request(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("stream").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

fn unauthorized() -> Response<MockBody> {
    full_response(
        StatusCode::UNAUTHORIZED,
        "application/json",
        Bytes::from_static(
            br#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ),
    )
}

fn sse_event(event: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

fn delta_event(index: usize, delta_type: &str, field: &str, text: &str) -> Bytes {
    let delta = serde_json::json!({
        "type": "content_block_delta",
        "index": index,
        "delta": { "type": delta_type, field: text },
    });
    sse_event("content_block_delta", &delta.to_string())
}

fn pieces(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + DELTA_TARGET_BYTES).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(&text[start..end]);
        start = end;
    }
    out
}

fn text_events(with_thinking: bool) -> Vec<Bytes> {
    let mut events = vec![
        sse_event(
            "message_start",
            r#"{"type":"message_start","message":{"id":"msg_mock","type":"message","role":"assistant","model":"claude-3-5-sonnet-20241022","content":[],"usage":{"input_tokens":12,"output_tokens":1}}}"#,
        ),
        sse_event("ping", r#"{"type":"ping"}"#),
    ];

    let mut index = 0;
    if with_thinking {
        events.push(sse_event(
            "content_block_start",
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#,
        ));
        for piece in pieces(MOCK_THINKING) {
            events.push(delta_event(0, "thinking_delta", "thinking", piece));
        }
        events.push(sse_event(
            "content_block_stop",
            r#"{"type":"content_block_stop","index":0}"#,
        ));
        index = 1;
    }

    events.push(sse_event(
        "content_block_start",
        &format!(
            r#"{{"type":"content_block_start","index":{index},"content_block":{{"type":"text","text":""}}}}"#
        ),
    ));
    for piece in pieces(MOCK_ANSWER) {
        events.push(delta_event(index, "text_delta", "text", piece));
    }
    events.push(sse_event(
        "content_block_stop",
        &format!(r#"{{"type":"content_block_stop","index":{index}}}"#),
    ));
    events.push(sse_event(
        "message_delta",
        r#"{"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":96}}"#,
    ));
    events.push(sse_event("message_stop", r#"{"type":"message_stop"}"#));
    events
}

fn streaming_response(
    events: Vec<Bytes>,
    fail_with: Option<&'static str>,
    delay: Duration,
) -> Response<MockBody> {
    let frames = stream::unfold(
        (events.into_iter(), fail_with),
        move |(mut events, fail_with)| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match events.next() {
                Some(event) => Some((Ok(Frame::data(event)), (events, fail_with))),
                None => fail_with.map(|message| {
                    (
                        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, message)),
                        (events, None),
                    )
                }),
            }
        },
    );

    let mut response = Response::new(StreamBody::new(frames).boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn full_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<MockBody> {
    let body: MockBody = Full::new(body).map_err(|never| match never {}).boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

const MOCK_THINKING: &str = "The user wants a write-heavy store. Partition by key, buffer writes, replicate asynchronously.";

const MOCK_ANSWER: &str = "Here is a plan for a write-heavy key-value store.\n\n\
Clients talk to a stateless gateway that routes each key to its shard.\n\n\
```mermaid title=\"Write path\" type=\"flowchart\"\n\
graph TD\n\
  Client-->Gateway\n\
  Gateway-->ShardA[Shard A]\n\
  Gateway-->ShardB[Shard B]\n\
  ShardA-->WAL[(Write-ahead log)]\n\
```\n\
Each shard appends to its write-ahead log before acknowledging, then replicates to two followers.";
