// ── Core error types ──
//
// User-facing errors from wiser-core. Consumers never match on HTTP status
// codes or serde failures directly; the `From<wiser_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Hub request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Push channel is not connected")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unexpected response from hub: {message}")]
    Decode { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Hub rejected the request: {message}")]
    Api {
        message: String,
        /// HTTP status code (if the hub answered without an envelope).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wiser_api::Error> for CoreError {
    fn from(err: wiser_api::Error) -> Self {
        match err {
            wiser_api::Error::Configuration { field, reason } => CoreError::Config {
                message: format!("{field}: {reason}"),
            },
            wiser_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            wiser_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        host: e
                            .url()
                            .and_then(|u| u.host_str().map(str::to_owned))
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            wiser_api::Error::Http {
                status: 401 | 403,
                body,
            } => CoreError::AuthenticationFailed {
                message: if body.is_empty() {
                    "the hub rejected the API key".into()
                } else {
                    body
                },
            },
            wiser_api::Error::Http { status: 404, body } => CoreError::NotFound { resource: body },
            wiser_api::Error::Http { status, body } => CoreError::Api {
                message: body,
                status: Some(status),
            },
            wiser_api::Error::HostNotFound { host } => CoreError::ConnectionFailed {
                host,
                reason: "host name could not be resolved".into(),
            },
            wiser_api::Error::WebSocket(reason) => CoreError::ConnectionFailed {
                host: String::new(),
                reason: format!("WebSocket error: {reason}"),
            },
            wiser_api::Error::Api { message, .. } => CoreError::Api {
                message,
                status: None,
            },
            wiser_api::Error::Decode { message, body: _ } => CoreError::Decode { message },
        }
    }
}
