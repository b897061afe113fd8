use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Nimbus stochastic precipitation nowcasting.
#[derive(Parser)]
#[command(
    name = "nimbus",
    version,
    about = "Stochastic ensemble precipitation nowcasting"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run an ensemble nowcast and write a JSON summary.
    Forecast(ForecastArgs),
}

/// Arguments for the `forecast` subcommand.
#[derive(clap::Args)]
pub struct ForecastArgs {
    /// Path to TOML configuration file (built-in defaults when absent).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON file with `history` and `motion` arrays. A synthetic scenario
    /// from the `[synthetic]` table is used when absent.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Path for the JSON summary (stdout when absent).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}
