//! Clap derive structures for the `tiltview` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tiltview -- resources of a running Tilt session, grouped by label
#[derive(Debug, Parser)]
#[command(
    name = "tiltview",
    version,
    about = "Watch and drive a running Tilt session from the terminal",
    long_about = "Connects to the Tilt server's live view stream, groups resources\n\
        by label, and triggers updates or enables/disables resources.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Tilt server host; `host:port` also sets the port
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Tilt server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for the initial view before giving up
    #[arg(long, value_name = "SECS", global = true)]
    pub wait_secs: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TILTVIEW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the live label tree, redrawn on every change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List labels that currently hold resources
    Labels,

    /// List resources, optionally for a single label
    #[command(alias = "ls")]
    Resources(ResourcesArgs),

    /// Show one resource in full
    Get(NameArgs),

    /// Ask Tilt to rebuild a resource
    #[command(alias = "restart")]
    Trigger(NameArgs),

    /// Enable a disabled resource, or disable an enabled one
    Toggle(NameArgs),

    /// Manage the tiltview configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print the tree once the initial view arrives, then exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Args)]
pub struct ResourcesArgs {
    /// Only resources carrying this label (`unlabeled` for none)
    #[arg(long, short = 'l')]
    pub label: Option<String>,
}

#[derive(Debug, Args)]
pub struct NameArgs {
    /// Resource name
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
