// ── Core error types ──
//
// Session-level errors from tiltview-core. Consumers see action outcomes
// and lookup failures here; raw transport details are folded in by the
// `From<tiltview_api::Error>` impl.

use thiserror::Error;
use tiltview_api::datetime::FormatError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Tilt at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Tilt view stream disconnected")]
    Disconnected,

    #[error("Timed out after {timeout_secs}s waiting for the initial view")]
    Timeout { timeout_secs: u64 },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Resource not found: {name}")]
    ResourceNotFound { name: String },

    #[error("Resource '{name}' has no enable/disable status")]
    NotToggleable { name: String },

    #[error("No resourceVersion known for button '{button}'")]
    ButtonVersionMissing { button: String },

    // ── Action errors ────────────────────────────────────────────────
    #[error("Tilt rejected the request (HTTP {status})")]
    Rejected {
        status: u16,
        /// Response body, parsed as JSON when possible.
        body: Option<serde_json::Value>,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("API error: {message}")]
    Api { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tiltview_api::Error> for CoreError {
    fn from(err: tiltview_api::Error) -> Self {
        match err {
            tiltview_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                    }
                }
            }
            tiltview_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tiltview_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            tiltview_api::Error::WebSocketClosed { .. } => CoreError::Disconnected,
            tiltview_api::Error::Rejected { status, body } => CoreError::Rejected { status, body },
        }
    }
}
