use thiserror::Error;

/// Top-level error type for the `tiltview-api` crate.
///
/// Covers every failure mode of the wire layer: HTTP transport, the
/// WebSocket view stream, and non-success responses to action
/// requests. `tiltview-core` maps these into session-level
/// errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed to open or errored mid-stream.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the server with a non-normal close code.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Actions ─────────────────────────────────────────────────────
    /// The Tilt server answered an action request with a non-2xx status.
    ///
    /// `body` holds the response parsed as JSON when possible, or the raw
    /// text wrapped in a JSON string otherwise.
    #[error("Tilt server rejected the request (HTTP {status})")]
    Rejected {
        status: u16,
        body: Option<serde_json::Value>,
    },
}

impl Error {
    /// HTTP status of a rejected action request, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
