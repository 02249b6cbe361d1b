//! `geocatalog inspect`: show what ingestion would record for one file.

use std::path::PathBuf;

use clap::Args;
use geocatalog::types::to_storage_type;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for `inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Shapefile or GeoPackage to inspect
    pub file: PathBuf,

    /// Layer to inspect (default: first layer with geometry)
    #[arg(long)]
    pub layer: Option<String>,
}

/// Run the inspect command.
pub fn run(args: InspectArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("inspect");

    let extract = runner
        .loader()
        .extract_layer(&args.file, args.layer.as_deref())
        .map_err(|error| CliError::Inspect {
            file: args.file.clone(),
            error,
        })?;

    let Some(extract) = extract else {
        println!("{}: no layer with geometry", args.file.display());
        return Ok(());
    };

    let metadata = &extract.metadata;
    let values = &extract.values;
    let epsg = metadata
        .epsg
        .map_or_else(|| "unknown".to_string(), |code| format!("EPSG:{}", code));

    println!("File:      {}", args.file.display());
    println!("Driver:    {}", metadata.driver);
    println!("Layer:     {}", metadata.layer_name);
    println!("Geometry:  {}", metadata.geometry);
    println!("CRS:       {}", epsg);
    println!("Encoding:  {}", values.encoding);
    println!("Rows:      {}", values.row_count);
    println!();
    println!(
        "  {:<24} {:<12} {:<14} {:>8}",
        "ATTRIBUTE", "SOURCE TYPE", "STORAGE TYPE", "DISTINCT"
    );
    for field in &metadata.attributes {
        let distinct = values.get(&field.name).map_or(0, <[String]>::len);
        println!(
            "  {:<24} {:<12} {:<14} {:>8}",
            field.name,
            field.type_tag,
            to_storage_type(&field.type_tag),
            distinct
        );
    }

    Ok(())
}
