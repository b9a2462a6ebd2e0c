//! Configuration for the tiltview CLI.
//!
//! A single TOML file in the platform config directory, overlaid by the
//! `TILT_*` environment variables Tilt itself honours, and translated to
//! `tiltview_core::ServerConfig`. The core never reads files; the CLI
//! applies its own flag overrides on top of what this crate loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tiltview_core::{Endpoint, ServerConfig};

/// Environment prefix shared with Tilt (`TILT_HOST`, `TILT_PORT`).
pub const ENV_PREFIX: &str = "TILT_";

const ENV_KEYS: &[&str] = &["host", "port", "health_check_interval_ms", "wait_secs"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Tilt server host. A `host:port` value also sets the port; an IPv6
    /// address needs brackets (`[::1]:10350`) to carry one.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Supervisor tick in milliseconds.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,

    /// How long one-shot commands wait for the initial snapshot.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            health_check_interval_ms: default_health_check_interval_ms(),
            wait_secs: default_wait_secs(),
        }
    }
}

fn default_host() -> String {
    Endpoint::default().host
}
fn default_port() -> u16 {
    Endpoint::default().port
}
fn default_health_check_interval_ms() -> u64 {
    1000
}
fn default_wait_secs() -> u64 {
    10
}

impl Config {
    /// Resolve host and port, splitting a `host:port` host value.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let (host, port) = split_host_port(&self.host)?;
        let port = port.unwrap_or(self.port);

        if host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if port == 0 {
            return Err(ConfigError::invalid("port", "must be between 1 and 65535"));
        }
        Ok(Endpoint::new(host, port))
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Translate to the runtime configuration the core consumes.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        if self.health_check_interval_ms == 0 {
            return Err(ConfigError::invalid("health_check_interval_ms", "must be positive"));
        }
        Ok(ServerConfig {
            endpoint: self.endpoint()?,
            health_check_interval: self.health_check_interval(),
            start_visible: true,
        })
    }
}

/// Split an optional port off a host value. A bare IPv6 address has
/// several colons and is taken whole.
fn split_host_port(value: &str) -> Result<(&str, Option<u16>), ConfigError> {
    let (host, port) = if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| ConfigError::invalid("host", format!("unclosed '[' in '{value}'")))?;
        if tail.is_empty() {
            (host, None)
        } else {
            let port = tail.strip_prefix(':').ok_or_else(|| {
                ConfigError::invalid("host", format!("unexpected '{tail}' after ']' in '{value}'"))
            })?;
            (host, Some(port))
        }
    } else if value.matches(':').count() > 1 {
        (value, None)
    } else {
        match value.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (value, None),
        }
    };

    let port = match port {
        None | Some("") => None,
        Some(port) => Some(
            port.parse::<u16>()
                .map_err(|e| ConfigError::invalid("host", format!("bad port in '{value}': {e}")))?,
        ),
    };
    Ok((host, port))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "tiltview", "tiltview").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tiltview");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `TILT_*` variables.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
}

/// Load the Config from an explicit file + environment. A missing file
/// is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
