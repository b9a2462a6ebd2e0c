// ── Runtime session configuration ──
//
// Describes *where* the Tilt server lives and how often the supervisor
// checks the connection. Never touches disk: the CLI builds a
// `ServerConfig` from `tiltview-config` and hands it in.

use std::time::Duration;

use tiltview_api::Endpoint;

/// Default supervisor tick.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a single [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host and port of the Tilt server.
    pub endpoint: Endpoint,
    /// How often the supervisor runs a health check.
    pub health_check_interval: Duration,
    /// Whether the session starts out visible. Hidden sessions never
    /// open new connections.
    pub start_visible: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            start_visible: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }
}
