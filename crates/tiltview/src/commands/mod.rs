//! Command dispatch: bridges CLI args -> session -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod view;
pub mod watch;

use std::time::Duration;

use tiltview_core::{ServerConfig, Session};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
///
/// Everything except `watch` is one-shot: connect, wait for the initial
/// snapshot (bounded by `wait`), act, shut down.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    server: ServerConfig,
    wait: Duration,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, global, server, wait).await,
        Command::Labels => {
            let view = Session::oneshot(server, wait, |s| async move { Ok(s.view()) }).await?;
            view::labels(&view, global)
        }
        Command::Resources(args) => {
            let view = Session::oneshot(server, wait, |s| async move { Ok(s.view()) }).await?;
            view::resources(&view, args.label.as_deref(), global)
        }
        Command::Get(args) => {
            let view = Session::oneshot(server, wait, |s| async move { Ok(s.view()) }).await?;
            view::get(&view, &args.name, global)
        }
        Command::Trigger(args) => actions::trigger(server, wait, &args.name, global).await,
        Command::Toggle(args) => actions::toggle(server, wait, &args.name, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
