//! `geocatalog ingest`: rebuild the catalog from a data directory.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use geocatalog::ingest::FailurePolicy;

use crate::error::CliError;
use crate::runner::CliRunner;

/// What to do with a file that cannot be read.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OnError {
    /// Report the file and keep going
    Skip,
    /// Stop the run without writing anything
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Skip => FailurePolicy::Skip,
            OnError::Abort => FailurePolicy::Abort,
        }
    }
}

/// Arguments for `ingest`.
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Root directory scanned for datasets (default: data.directory)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Catalog SQLite file (default: catalog.path)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Failure policy for unreadable files (default: ingest.on_error)
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,
}

/// Run the ingest command.
pub fn run(args: IngestArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("ingest");

    let data_dir = runner.data_directory(args.data_dir)?;
    let mut loader = runner.loader();
    if let Some(on_error) = args.on_error {
        loader = loader.with_failure_policy(on_error.into());
    }

    let mut catalog = runner.open_catalog(args.catalog.as_deref())?;
    println!("Scanning {}", data_dir.display());

    let report = loader.run(&data_dir, catalog.begin()?)?;
    print!("{}", report);

    let counts = catalog.counts()?;
    println!();
    println!(
        "Catalog: {} layer(s), {} attribute(s), {} value(s), {} geometry type(s), {} attribute type(s)",
        counts.geolayers,
        counts.attributes,
        counts.attribute_values,
        counts.geometry_types,
        counts.attribute_types
    );
    if let Some(path) = catalog.path() {
        println!("Written to {}", path.display());
    }

    Ok(())
}
