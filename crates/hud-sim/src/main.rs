#![warn(missing_docs)]

//! Entry point for the `hud-sim` binary.

mod cli;
mod error;
mod host;
mod runner;
mod scenario;

use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, registry};

use crate::{
    cli::{CheckSettingsArgs, Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    let env_filter = logging::env_filter_from_spec(&log.spec());
    registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    match command {
        Commands::Run(args) => runner::run(&args),
        Commands::CheckSettings(args) => check_settings(&args),
    }
}

/// Load a settings file and report the effective values.
fn check_settings(args: &CheckSettingsArgs) -> Result<()> {
    let settings = hud_config::load_settings_from_path(&args.path)?;
    info!(path = %args.path.display(), "settings_ok");
    println!("{settings:#?}");
    if (settings.clamped_scale() - settings.scale).abs() > f32::EPSILON {
        println!(
            "note: scale {} is out of range and will be clamped to {}",
            settings.scale,
            settings.clamped_scale()
        );
    }
    Ok(())
}
