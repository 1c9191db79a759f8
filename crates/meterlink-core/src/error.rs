use thiserror::Error;

/// Error `data` strings the monitoring backend uses to signal that the
/// current auth token is no longer valid. This is the only RPC error
/// condition the core distinguishes; everything else is surfaced unmodified.
pub const SESSION_EXPIRED_SIGNATURES: &[&str] = &[
    "Session terminated, re-login, please.",
    "Not authorised.",
    "Not authorized",
];

/// Errors that can occur when talking to either monitoring backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DatasourceError {
    /// Request exceeded the transport's timeout.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the backend endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error (non-2xx status code).
    ///
    /// First field is the HTTP status code, second the (truncated) body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error returned by the monitoring backend.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// Query error reported by the metrics backend (e.g. malformed
    /// expression). Fails the whole batched query operation.
    #[error("Query failed: {0}")]
    Query(String),

    /// Response could not be parsed or did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built or is not supported by the
    /// configured protocol version.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl DatasourceError {
    /// Returns `true` if this is the monitoring backend's session-expired
    /// signal, i.e. an RPC error whose `data` field carries one of the
    /// known signature strings. The session client recovers from this
    /// locally with exactly one re-login and retry.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::Rpc { data: Some(data), .. } => {
                SESSION_EXPIRED_SIGNATURES.contains(&data.as_str())
            }
            _ => false,
        }
    }
}
