use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and a config summary; never exposes the credential.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "archchat is running",
        "config": {
            "model": config.upstream.model,
            "credential_configured": state.api_key().is_some(),
            "max_turn_duration_secs": config.server.max_turn_duration_secs,
            "steering_suffix_enabled": config.upstream.steering_suffix.is_some(),
            "reasoning_available": config.upstream.thinking_budget_tokens.is_some(),
            "log_level": config.features.log_level,
            "log_format": config.features.log_format,
        }
    }))
}
