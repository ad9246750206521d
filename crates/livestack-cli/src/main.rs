mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "livestack", about = "Live stacking of astronomical exposures")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a FITS exposure is classified and keyed
    Info(commands::info::InfoArgs),
    /// Calibrate, align and stack exposures into their running stacks
    Ingest(commands::ingest::IngestArgs),
    /// List the stacks in a storage directory
    Stacks(commands::stacks::StacksArgs),
    /// Print or save a default pipeline config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Ingest(_), false) => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Ingest(args) => commands::ingest::run(args),
        Commands::Stacks(args) => commands::stacks::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
