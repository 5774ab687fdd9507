use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::BridgeError;
use crate::observability::TurnEvent;
use crate::protocol::anthropic::encoder::encode_upstream_request;
use crate::protocol::downstream::FrameOptions;
use crate::protocol::inbound::parse_chat_request;
use crate::state::AppState;
use crate::stream::TurnBridge;

const DOWNSTREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// `POST /api/chat`: stream one assistant turn back as downstream frames.
///
/// Everything that can be rejected before contacting the provider is answered
/// with a JSON error and no stream. Once streaming starts, failures arrive
/// in-band as an error frame followed by `Done`.
pub async fn handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match handler_inner(state, body) {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "chat request rejected");
            err.into_response()
        }
    }
}

fn handler_inner(state: Arc<AppState>, body: Bytes) -> Result<Response, BridgeError> {
    let log_payloads = state.config.features.log_payloads;
    if log_payloads {
        tracing::debug!(body = %String::from_utf8_lossy(&body), "inbound chat request");
    }

    let request = parse_chat_request(&body)?;
    let upstream_request =
        encode_upstream_request(&request.turns, &state.config.upstream, request.reasoning)?;
    let api_key = state
        .api_key()
        .ok_or_else(|| BridgeError::Configuration("API key not configured".to_string()))?;
    let upstream_body = serde_json::to_vec(&upstream_request)
        .map_err(|err| BridgeError::Internal(format!("Failed to encode upstream request: {err}")))?;

    let turn_id = state.next_turn_id();
    let recorder = state.recorder();
    if log_payloads {
        recorder.record(
            turn_id,
            TurnEvent::UpstreamRequest {
                body: String::from_utf8_lossy(&upstream_body).into_owned(),
            },
        );
    }

    let connect = state.transport.open_stream(api_key, Bytes::from(upstream_body))?;
    tracing::debug!(
        turn = %turn_id,
        turns = request.turns.len(),
        reasoning = request.reasoning,
        "starting chat turn"
    );

    let bridge = TurnBridge::new(
        turn_id,
        recorder,
        FrameOptions {
            expose_reasoning: request.reasoning,
        },
    );
    let frames = bridge.into_body_stream(connect, state.config.server.max_turn_duration());
    Ok(stream_ok_response(Body::from_stream(frames)))
}

fn stream_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(DOWNSTREAM_CONTENT_TYPE),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}
