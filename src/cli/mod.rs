//! Command-line interface definitions.

pub mod check;
pub mod output;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bribery-sim - Simulate a bribery market for last-slot proposer decisions.
#[derive(Parser, Debug)]
#[command(name = "bribery-sim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation and print the resulting balance sheets
    Run(RunArgs),

    /// Validate a configuration file
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of epochs to simulate
    #[arg(short, long, default_value = "1000")]
    pub epochs: u64,

    /// Override the master seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Print one JSON epoch report per line instead of the balance table
    #[arg(long)]
    pub json: bool,
}
