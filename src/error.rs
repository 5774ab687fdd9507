/// Error type shared by the bridge, the transport and the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),
    #[error("Upstream error: status={status}, message={message}")]
    UpstreamProtocol { status: u16, message: String },
    #[error("Decode fault: {0}")]
    DecodeFault(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Misconfigured,
    Upstream,
    ServerError,
}

impl BridgeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::InvalidInput(_) => ErrorCategory::InvalidRequest,
            BridgeError::Configuration(_) => ErrorCategory::Misconfigured,
            BridgeError::UpstreamTransport(_) | BridgeError::UpstreamProtocol { .. } => {
                ErrorCategory::Upstream
            }
            BridgeError::DecodeFault(_) | BridgeError::Internal(_) => ErrorCategory::ServerError,
        }
    }

    /// Message shown to the browser when this error ends a stream in-band.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            BridgeError::UpstreamProtocol { message, .. } => message.clone(),
            BridgeError::UpstreamTransport(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Message used for the JSON body of a non-streaming failure.
    fn response_message(&self) -> &str {
        match self {
            BridgeError::InvalidInput(message)
            | BridgeError::Configuration(message)
            | BridgeError::UpstreamTransport(message)
            | BridgeError::DecodeFault(message)
            | BridgeError::Internal(message)
            | BridgeError::UpstreamProtocol { message, .. } => message,
        }
    }
}

// ---------------------------------------------------------------------------
// Category -> HTTP status code
// ---------------------------------------------------------------------------

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::Upstream => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::Misconfigured | ErrorCategory::ServerError => {
            http::StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Format an error as a non-streaming response, returning (`status_code`, JSON body).
#[must_use]
pub fn format_error(err: &BridgeError) -> (http::StatusCode, serde_json::Value) {
    let status = http_status_for_category(err.category());
    let body = serde_json::json!({ "error": err.response_message() });
    (status, body)
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

impl axum::response::IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
