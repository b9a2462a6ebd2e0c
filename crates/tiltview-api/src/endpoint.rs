// Tilt server addressing
//
// Every URL the view talks to hangs off one host/port pair: the WebSocket
// view stream and the HTTP action endpoints.

use std::fmt;

use url::Url;

use crate::error::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 10350;

/// Host and port of a running Tilt server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `ws://{host}:{port}/ws/view`
    pub fn view_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("ws://{self}/ws/view"))?)
    }

    /// `http://{host}:{port}/{path}`
    pub fn http_url(&self, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{self}/{}", path.trim_start_matches('/')))?)
    }
}

/// `host:port`, with an IPv6 host in brackets.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_local_tilt() {
        let endpoint = Endpoint::default();
        assert_eq!(
            endpoint.view_url().unwrap().as_str(),
            "ws://localhost:10350/ws/view"
        );
    }

    #[test]
    fn http_url_joins_path() {
        let endpoint = Endpoint::new("127.0.0.1", 8080);
        assert_eq!(
            endpoint.http_url("/api/trigger").unwrap().as_str(),
            "http://127.0.0.1:8080/api/trigger"
        );
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let endpoint = Endpoint::new("::1", 10350);
        assert_eq!(endpoint.to_string(), "[::1]:10350");
        assert_eq!(endpoint.view_url().unwrap().as_str(), "ws://[::1]:10350/ws/view");
        assert_eq!(
            endpoint.http_url("api/trigger").unwrap().as_str(),
            "http://[::1]:10350/api/trigger"
        );
    }

    #[test]
    fn invalid_host_is_rejected() {
        let endpoint = Endpoint::new("bad host", 1);
        assert!(matches!(endpoint.view_url(), Err(Error::InvalidUrl(_))));
    }
}
