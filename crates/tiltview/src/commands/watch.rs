//! `tiltview watch`: the live label tree.
//!
//! The session keeps its own supervisor running; this loop only redraws,
//! once per view change or connection state change, until Ctrl-C.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use tokio_stream::StreamExt;
use tracing::info;

use tiltview_core::{ServerConfig, Session, SessionPhase, SessionView};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;
use crate::tree::{format_tree, render_tree};

pub async fn handle(
    args: WatchArgs,
    global: &GlobalOpts,
    server: ServerConfig,
    wait: Duration,
) -> Result<(), CliError> {
    let endpoint = server.endpoint.to_string();
    let session = Session::new(server)?;
    let changes = session.change_subscription();
    let mut state = session.connection_state();
    session.start().await;

    if args.once {
        let result = session.wait_until_initialized(wait).await;
        session.shutdown().await;
        let view = result?;
        let out = Screen::new(global, endpoint, false).render(
            &view,
            SessionPhase::ConnectedInitialized,
            None,
        )?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let screen = Screen::new(global, endpoint, io::stdout().is_terminal());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // The first item is the current view, so the screen is drawn at once.
    let mut views = changes.into_stream();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
            view = views.next() => {
                let Some(view) = view else { break };
                screen.draw(&view, session.phase(), session.last_error())?;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                screen.draw(&session.view(), session.phase(), session.last_error())?;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

struct Screen {
    format: OutputFormat,
    color: bool,
    quiet: bool,
    clear: bool,
    endpoint: String,
}

impl Screen {
    fn new(global: &GlobalOpts, endpoint: String, interactive: bool) -> Self {
        let table = global.output == OutputFormat::Table;
        Self {
            format: global.output,
            color: table && output::should_color(global.color),
            quiet: global.quiet,
            clear: table && interactive,
            endpoint,
        }
    }

    /// One frame. JSON formats emit one line per frame so the stream can
    /// be piped.
    fn render(
        &self,
        view: &SessionView,
        phase: SessionPhase,
        last_error: Option<&str>,
    ) -> Result<String, CliError> {
        let tree = render_tree(view);
        match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(&tree)?),
            OutputFormat::Plain => Ok(format_tree(&tree, false)),
            OutputFormat::Table => {
                let mut out = format!("tiltview · {} · {phase}", self.endpoint);
                if let Some(error) = last_error {
                    out.push_str(&format!("\n{error}"));
                }
                out.push_str("\n\n");
                if tree.is_empty() {
                    out.push_str("(waiting for Tilt)");
                } else {
                    out.push_str(&format_tree(&tree, self.color));
                }
                Ok(out)
            }
        }
    }

    fn draw(
        &self,
        view: &SessionView,
        phase: SessionPhase,
        last_error: Option<String>,
    ) -> Result<(), CliError> {
        if self.quiet {
            return Ok(());
        }
        let frame = self.render(view, phase, last_error.as_deref())?;
        let mut stdout = io::stdout().lock();
        if self.clear {
            write!(stdout, "\x1b[2J\x1b[H")?;
        }
        writeln!(stdout, "{frame}")?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use tiltview_core::Store;

    use super::*;
    use crate::cli::Cli;

    fn screen(args: &[&str]) -> Screen {
        let mut argv = vec!["tiltview"];
        argv.extend_from_slice(args);
        argv.push("watch");
        let cli = Cli::try_parse_from(argv).unwrap();
        Screen::new(&cli.global, "localhost:10350".into(), false)
    }

    #[test]
    fn table_frame_shows_phase_and_placeholder() {
        let view = Store::new().view();
        let frame = screen(&["--color", "never"])
            .render(&view, SessionPhase::Connecting, Some("connection refused"))
            .unwrap();

        assert_eq!(
            frame,
            "tiltview · localhost:10350 · connecting\nconnection refused\n\n(waiting for Tilt)"
        );
    }

    #[test]
    fn json_frame_is_one_line() {
        let view = Store::new().view();
        let frame = screen(&["-o", "json"])
            .render(&view, SessionPhase::ConnectedUninitialized, None)
            .unwrap();
        assert_eq!(frame, "[]");
    }
}
