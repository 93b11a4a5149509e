//! Command-line interface definitions for hud-sim.

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `hud-sim` binary.
#[derive(Parser, Debug)]
#[command(
    name = "hud-sim",
    about = "Drive the token action HUD engine from a scripted scenario",
    version
)]
pub struct Cli {
    /// Logging controls shared across HUD binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a scenario and print every view message the engine emits.
    Run(RunArgs),
    /// Parse and validate a settings file.
    CheckSettings(CheckSettingsArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario file in RON syntax.
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Persist user flags to this file instead of keeping them in memory.
    #[arg(long, value_name = "PATH")]
    pub flags: Option<PathBuf>,

    /// Time to let the engine settle after each step. Must exceed the
    /// scenario's debounce window for selection steps to render.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "100ms",
        value_name = "DURATION"
    )]
    pub settle: Duration,

    /// Print view messages as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `check-settings` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckSettingsArgs {
    /// Settings file in RON syntax.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}
