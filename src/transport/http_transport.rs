use std::time::Duration;

use bytes::Bytes;
use futures_util::TryStreamExt;

use crate::config::{ServerConfig, UpstreamConfig};
use crate::error::BridgeError;
use crate::protocol::anthropic::AnthropicErrorEnvelope;
use crate::stream::{UpstreamBody, UpstreamConnect};

const MESSAGES_PATH: &str = "/v1/messages";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
) -> Result<reqwest::Client, BridgeError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .map_err(|err| BridgeError::Internal(format!("Failed to build HTTP client: {err}")))
}

/// Pooled HTTP client for the provider's Messages endpoint.
///
/// The overall turn deadline is enforced by the stream bridge, so the client
/// itself only bounds connection establishment.
pub struct HttpTransport {
    client: reqwest::Client,
    messages_url: String,
    api_version: http::HeaderValue,
}

impl HttpTransport {
    /// Build the transport from validated config.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] when the API version is not a
    /// valid header value, or [`BridgeError::Internal`] when the HTTP client
    /// cannot be constructed.
    pub fn new(server: &ServerConfig, upstream: &UpstreamConfig) -> Result<Self, BridgeError> {
        let pool_idle_timeout = if server.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(server.http_pool_idle_timeout_secs))
        };
        let client = build_reqwest_client(server.http_pool_max_idle_per_host.max(1), pool_idle_timeout)?;
        let api_version = http::HeaderValue::from_str(&upstream.api_version).map_err(|_| {
            BridgeError::Configuration(format!(
                "Invalid anthropic-version header value: {}",
                upstream.api_version
            ))
        })?;
        Ok(Self {
            client,
            messages_url: messages_url(&upstream.base_url),
            api_version,
        })
    }

    #[must_use]
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// Prepare a streaming Messages request.
    ///
    /// Nothing is sent until the returned future is first polled. It resolves
    /// to the response body once a success status arrives; a non-success
    /// status is read in full and turned into [`BridgeError::UpstreamProtocol`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] when the credential cannot be
    /// sent as a header value.
    pub fn open_stream(&self, api_key: &str, body: Bytes) -> Result<UpstreamConnect, BridgeError> {
        let mut api_key = http::HeaderValue::from_str(api_key).map_err(|_| {
            BridgeError::Configuration("API key contains invalid characters".to_string())
        })?;
        api_key.set_sensitive(true);

        let request = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", self.api_version.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::ACCEPT, "text/event-stream")
            .body(body);

        Ok(Box::pin(async move {
            let response = request.send().await.map_err(|err| {
                BridgeError::UpstreamTransport(format!("Upstream request failed: {err}"))
            })?;
            let status = response.status();
            if !status.is_success() {
                let body = response.bytes().await.map_err(|err| {
                    BridgeError::UpstreamTransport(format!("Failed to read response body: {err}"))
                })?;
                return Err(BridgeError::UpstreamProtocol {
                    status: status.as_u16(),
                    message: upstream_error_message(status, &body),
                });
            }

            let body: UpstreamBody = Box::pin(response.bytes_stream().map_err(|err| {
                BridgeError::UpstreamTransport(format!("Upstream stream interrupted: {err}"))
            }));
            Ok(body)
        }))
    }
}

fn messages_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = base.strip_suffix(MESSAGES_PATH).unwrap_or(base);
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}{MESSAGES_PATH}")
}

/// Provider `error.message` when the body carries one, else the reason phrase.
fn upstream_error_message(status: http::StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<AnthropicErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Upstream request failed")
                .to_string()
        })
}
