//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Development loop for web-view desktop apps.
///
/// Starts the content server, builds the bridge and host bundles, then runs
/// the host process and restarts it whenever the build output changes.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, default_value = "devloop.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Content server port (the host process is pointed at this port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Launch the host process without the debugger port argument
    #[arg(long)]
    pub no_inspect: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
