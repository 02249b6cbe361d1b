//! geocatalog CLI - Command-line interface
//!
//! This binary provides a command-line interface to the geocatalog library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::ingest::IngestArgs;
use commands::inspect::InspectArgs;
use commands::reconcile::ReconcileArgs;

#[derive(Debug, Parser)]
#[command(name = "geocatalog")]
#[command(version = geocatalog::VERSION)]
#[command(about = "Catalog Shapefile and GeoPackage datasets into SQLite", long_about = None)]
struct Cli {
    /// Force debug-level logging and mirror logs to stdout
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the catalog from every dataset under the data directory
    Ingest(IngestArgs),

    /// Compare the data directory with its metadata inventory
    Reconcile(ReconcileArgs),

    /// Show schema, CRS, storage types and encoding of one file
    Inspect(InspectArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, cli.debug),
        Commands::Reconcile(args) => commands::reconcile::run(args, cli.debug),
        Commands::Inspect(args) => commands::inspect::run(args, cli.debug),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
