//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use tiltview_config::ConfigError;
use tiltview_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Tilt at {url}")]
    #[diagnostic(
        code(tiltview::connection_failed),
        help(
            "Check that `tilt up` is running and serving its web UI.\n\
             Reason: {reason}\n\
             Try: tiltview --host localhost --port 10350 labels"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("The Tilt view stream closed")]
    #[diagnostic(code(tiltview::disconnected), help("Tilt may have exited; run the command again."))]
    Disconnected,

    #[error("No initial view after {seconds}s")]
    #[diagnostic(
        code(tiltview::timeout),
        help("Increase the wait with --wait-secs or check that Tilt is responsive.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Resource '{name}' not found")]
    #[diagnostic(
        code(tiltview::not_found),
        help("Run: tiltview resources to see available resources")
    )]
    NotFound { name: String },

    #[error("Resource '{name}' cannot be enabled or disabled")]
    #[diagnostic(
        code(tiltview::not_toggleable),
        help("Only resources that report a disable status can be toggled.")
    )]
    NotToggleable { name: String },

    #[error("Button '{button}' is not known to the session")]
    #[diagnostic(
        code(tiltview::button_missing),
        help("Tilt has not published the button yet; try again once the view has synced.")
    )]
    ButtonMissing { button: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Tilt rejected the request (HTTP {status})")]
    #[diagnostic(code(tiltview::rejected), help("Server said: {body}"))]
    Rejected { status: u16, body: String },

    #[error("API error: {message}")]
    #[diagnostic(code(tiltview::api_error))]
    ApiError { message: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tiltview::validation))]
    Validation { field: String, reason: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(tiltview::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(tiltview::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(tiltview::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(tiltview::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::Rejected { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Rejected { status: 409, .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::ConfigExists { .. } | Self::NotToggleable { .. } => {
                exit_code::USAGE
            }
            Self::ButtonMissing { .. }
            | Self::Rejected { .. }
            | Self::ApiError { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Disconnected => Self::Disconnected,
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ResourceNotFound { name } => Self::NotFound { name },
            CoreError::NotToggleable { name } => Self::NotToggleable { name },
            CoreError::ButtonVersionMissing { button } => Self::ButtonMissing { button },
            CoreError::Rejected { status, body } => Self::Rejected {
                status,
                body: body.map_or_else(|| "(empty body)".to_owned(), |b| b.to_string()),
            },
            CoreError::Api { message } => Self::ApiError { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Format(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_status_picks_exit_code() {
        let not_found = CliError::from(CoreError::Rejected {
            status: 404,
            body: None,
        });
        let conflict = CliError::from(CoreError::Rejected {
            status: 409,
            body: Some(serde_json::json!({ "reason": "Conflict" })),
        });
        let other = CliError::from(CoreError::Rejected {
            status: 500,
            body: None,
        });

        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);
        assert_eq!(other.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn transport_failures_map_to_connection_codes() {
        let failed = CliError::from(CoreError::ConnectionFailed {
            url: "localhost:10350".into(),
            reason: "refused".into(),
        });
        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 3 });

        assert_eq!(failed.exit_code(), exit_code::CONNECTION);
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "port".into(),
            reason: "must be between 1 and 65535".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
