//! Shared HTTP transport both backend clients dispatch through.
//!
//! The transport is deliberately thin: it issues a single request and maps
//! the outcome into [`DatasourceError`] categories. Retry policy lives with
//! the callers (the session client's single re-login) or outside this crate
//! entirely.

use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::DatasourceError;

/// Timeout and identification settings for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TCP connect timeout in seconds.
    pub connect_timeout_seconds: u64,
    /// Total per-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { connect_timeout_seconds: 5, request_timeout_seconds: 30 }
    }
}

/// Maximum number of response-body bytes echoed into error messages.
const ERROR_BODY_LIMIT: usize = 256;

/// HTTP transport wrapping a pooled reqwest client.
///
/// Responses are surfaced as parsed JSON. An empty or whitespace-only body
/// is a successful `None`, not an error; both the metrics suggestion path
/// and the login path rely on this.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, DatasourceError> {
        Self::with_config(TransportConfig::default())
    }

    /// Creates a transport with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: TransportConfig) -> Result<Self, DatasourceError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("meterlink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http transport");
                DatasourceError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Issues a GET request and returns the parsed JSON body, or `None`
    /// when the backend answered with an empty body.
    ///
    /// # Errors
    ///
    /// - [`DatasourceError::Timeout`] if the request times out
    /// - [`DatasourceError::HttpError`] for non-2xx status codes
    /// - [`DatasourceError::ConnectionFailed`] for network failures
    /// - [`DatasourceError::InvalidResponse`] for non-JSON bodies
    pub async fn get_json(&self, url: &Url) -> Result<Option<Value>, DatasourceError> {
        tracing::debug!(url = %url, "transport GET");
        let response = self.client.get(url.clone()).send().await.map_err(map_send_error)?;
        read_json_body(response).await
    }

    /// Issues a POST request with a JSON body and returns the parsed JSON
    /// response, or `None` when the backend answered with an empty body.
    ///
    /// # Errors
    ///
    /// Same categories as [`get_json`](Self::get_json).
    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<Option<Value>, DatasourceError> {
        tracing::debug!(url = %url, "transport POST");
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;
        read_json_body(response).await
    }
}

/// Maps a reqwest send error into a stable transport error category.
fn map_send_error(error: reqwest::Error) -> DatasourceError {
    if error.is_timeout() {
        return DatasourceError::Timeout;
    }
    if error.is_connect() {
        return DatasourceError::ConnectionFailed("connection refused or unreachable".to_string());
    }
    DatasourceError::Network(error)
}

async fn read_json_body(response: reqwest::Response) -> Result<Option<Value>, DatasourceError> {
    let status = response.status();
    let text = response.text().await.map_err(DatasourceError::Network)?;

    if !status.is_success() {
        let truncated = if text.len() > ERROR_BODY_LIMIT {
            // Back off to a char boundary so multibyte bodies don't panic.
            let mut cut = ERROR_BODY_LIMIT;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &text[..cut])
        } else {
            text
        };
        return Err(DatasourceError::HttpError(status.as_u16(), truncated));
    }

    if text.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| DatasourceError::InvalidResponse(format!("Invalid JSON: {e}")))
}
