//! `geocatalog reconcile`: compare the data directory with its inventory.

use std::path::PathBuf;

use clap::Args;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `reconcile`.
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Root directory holding datasets and the inventory (default: data.directory)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Where files.csv and metadata.csv are written
    /// (default: reconcile.report_dir, else the data directory)
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Print the comparison only, without writing reports
    #[arg(long)]
    pub no_export: bool,
}

/// Run the reconcile command.
pub fn run(args: ReconcileArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("reconcile");

    let data_dir = runner.data_directory(args.data_dir)?;
    let reconciliation = runner.reconciler().run(&data_dir)?;

    println!(
        "Inventory: {} (table '{}', column '{}', matching on {})",
        reconciliation.inventory_path.display(),
        reconciliation.table,
        reconciliation.name_column,
        reconciliation.match_key
    );
    println!(
        "{} file(s) on disk, {} inventory row(s)",
        reconciliation.files.len(),
        reconciliation.inventory.rows.len()
    );

    let comparison = &reconciliation.comparison;
    println!();
    println!(
        "On disk but not in the inventory ({}):",
        comparison.not_in_inventory.len()
    );
    for name in &comparison.not_in_inventory {
        println!("  {}", name);
    }
    println!(
        "In the inventory but not on disk ({}):",
        comparison.not_on_disk.len()
    );
    for name in &comparison.not_on_disk {
        println!("  {}", name);
    }

    if args.no_export {
        return Ok(());
    }

    let report_dir = args
        .report_dir
        .or_else(|| runner.config().reconcile.report_dir.clone())
        .unwrap_or(data_dir);
    std::fs::create_dir_all(&report_dir).map_err(|e| {
        CliError::Config(format!(
            "cannot create report directory '{}': {}",
            report_dir.display(),
            e
        ))
    })?;
    let (files, metadata) = reconciliation.export(&report_dir)?;
    println!();
    println!("Reports written:");
    println!("  {}", files.display());
    println!("  {}", metadata.display());

    Ok(())
}
