//! Mutating commands: trigger an update, toggle enable/disable.

use std::time::Duration;

use serde::Serialize;

use tiltview_core::{DisableState, ServerConfig, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ActionResult {
    resource: String,
    action: &'static str,
}

impl ActionResult {
    fn message(&self) -> String {
        format!("Requested {} of {}", self.action, self.resource)
    }
}

/// The action a toggle requests, given the state at click time.
fn toggle_action(current: DisableState) -> &'static str {
    match current {
        DisableState::Enabled => "disable",
        DisableState::Disabled => "enable",
    }
}

fn report(result: &ActionResult, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, result, ActionResult::message, |r| {
        r.resource.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn trigger(
    server: ServerConfig,
    wait: Duration,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = name.to_owned();
    Session::oneshot(server, wait, |s| async move { s.restart(&resource).await }).await?;

    report(
        &ActionResult {
            resource: name.to_owned(),
            action: "update",
        },
        global,
    )
}

pub async fn toggle(
    server: ServerConfig,
    wait: Duration,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = name.to_owned();
    let current =
        Session::oneshot(server, wait, |s| async move { s.toggle_enable(&resource).await }).await?;

    report(
        &ActionResult {
            resource: name.to_owned(),
            action: toggle_action(current),
        },
        global,
    )
}
