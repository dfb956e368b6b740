use thiserror::Error;

use crate::models::JSendStatus;

/// Top-level error type for the `wiser-api` crate.
///
/// Covers every failure mode across both hub surfaces: configuration,
/// HTTP transport, the JSend envelope, payload decoding, and the WebSocket
/// push channel. `wiser-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Missing or malformed client configuration (host, API key).
    #[error("invalid {field}: {reason}")]
    Configuration { field: &'static str, reason: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP response that did not carry a JSend envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The hub's host name could not be resolved.
    #[error("Host not found: {host}")]
    HostNotFound { host: String },

    /// WebSocket handshake or stream failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    // ── Hub API ─────────────────────────────────────────────────────
    /// Envelope with `status` of `fail` or `error`.
    #[error("Hub API error ({status}): {message}")]
    Api { status: JSendStatus, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON decoding failed, with the raw body for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocket(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The hub-supplied message, if this is an envelope error.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    pub(crate) fn decode(err: &serde_json::Error, body: &str) -> Self {
        Self::Decode {
            message: err.to_string(),
            body: body.to_owned(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}
