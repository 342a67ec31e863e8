//! devloop - inner development loop for web-view desktop apps.
//!
//! Serves the UI layer, compiles the bridge and host bundles, then keeps
//! the host process running on the latest build until a termination signal.

mod bundle;
mod cli;
mod config;
mod core;
mod logger;
mod orchestrator;
mod outdir;
mod serve;
mod supervisor;
mod utils;
mod watch;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ColorChoice, Parser};

use bundle::CommandBundler;
use cli::Cli;
use config::DevConfig;
use orchestrator::Orchestrator;
use supervisor::ProcessLauncher;

fn main() -> Result<ExitCode> {
    // Install before anything slow so a signal during startup is handled
    let shutdown = core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = DevConfig::load(&cli)?;
    debug!("config"; "using {}", config.config_path.display());

    let server = serve::from_config(&config);
    let exit = Orchestrator {
        config: &config,
        server: server.as_ref(),
        bundler: &CommandBundler::new(&config),
        launcher: &ProcessLauncher,
    }
    .run(&shutdown)?;

    Ok(exit.into())
}
