//! Resolve the effective configuration: file and `TILT_*` environment via
//! `tiltview-config`, then command-line overrides on top.

use std::path::PathBuf;

use tiltview_config::{Config, load_config_from};
use tiltview_core::ServerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file this invocation reads and writes.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(tiltview_config::config_path)
}

/// Load the config file and apply `--host`, `--port` and `--wait-secs`.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&config_path(global))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

/// Effective config plus the core's runtime view of it.
pub fn server_config(global: &GlobalOpts) -> Result<(Config, ServerConfig), CliError> {
    let cfg = resolve(global)?;
    let server = cfg.to_server_config()?;
    Ok((cfg, server))
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(host) = &global.host {
        cfg.host.clone_from(host);
    }
    if let Some(port) = global.port {
        cfg.port = port;
    }
    if let Some(wait) = global.wait_secs {
        cfg.wait_secs = wait;
    }
}
