//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wiser_config::ConfigError;
use wiser_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to hub at {host}")]
    #[diagnostic(
        code(wiser::connection_failed),
        help(
            "Check that the hub is powered and reachable.\n\
             Host: {host}\n\
             Try: wiser loads list --host <address>"
        )
    )]
    ConnectionFailed {
        host: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Push channel is not connected")]
    #[diagnostic(code(wiser::not_connected))]
    NotConnected,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(wiser::auth_failed),
        help(
            "Verify the API key of profile '{profile}'.\n\
             Update it with: wiser config set api_key <key>"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(wiser::no_credentials),
        help(
            "Configure one with: wiser config init --host <address> --api-key <key>\n\
             Or set the WISER_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource} not found")]
    #[diagnostic(
        code(wiser::not_found),
        help("Run: wiser loads list (or wiser buttons list) to see available IDs")
    )]
    NotFound { resource: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Hub rejected the request: {message}")]
    #[diagnostic(code(wiser::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    #[error("Unexpected response from hub: {message}")]
    #[diagnostic(
        code(wiser::decode),
        help("The hub firmware may be newer than this client understands.")
    )]
    Decode { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wiser::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wiser::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wiser config init --profile {name} --host <address> --api-key <key>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(wiser::no_config),
        help(
            "Create one with: wiser config init --host <address> --api-key <key>\n\
             Or pass --host and --api-key directly.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(wiser::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(wiser::timeout),
        help("Increase timeout with --timeout or check hub responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(
        code(wiser::json),
        help("Pass the state as a JSON object, e.g. '{{\"bri\": 10000}}'.")
    )]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => CliError::ConnectionFailed {
                host,
                source: reason.into(),
            },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::NotConnected => CliError::NotConnected,
            CoreError::NotFound { resource } => CliError::NotFound { resource },
            CoreError::Decode { message } => CliError::Decode { message },
            CoreError::Api { message, status } => CliError::ApiError { message, status },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::AuthenticationFailed {
                    message: "bad key".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::NotFound {
                    resource: "load 9".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (CoreError::Timeout { timeout_secs: 5 }, exit_code::TIMEOUT),
            (CoreError::NotConnected, exit_code::CONNECTION),
            (
                CoreError::ConnectionFailed {
                    host: "hub.local".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Api {
                    message: "boom".into(),
                    status: None,
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn config_errors_keep_their_shape() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "home".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "No API key configured for profile 'home'");

        let err = CliError::from(ConfigError::Validation {
            field: "host".into(),
            reason: "empty".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
