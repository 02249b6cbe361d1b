//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and the exit code.

use std::fmt;
use std::path::PathBuf;
use std::process;

use geocatalog::catalog::CatalogError;
use geocatalog::config::ConfigFileError;
use geocatalog::ingest::{FileError, IngestError};
use geocatalog::reconcile::ReconcileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Neither `--data-dir` nor `data.directory` is set
    NoDataDirectory,
    /// Catalog store error
    Catalog(CatalogError),
    /// Ingestion run failed
    Ingest(IngestError),
    /// Reconciliation failed
    Reconcile(ReconcileError),
    /// A single file could not be read
    Inspect { file: PathBuf, error: FileError },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::NoDataDirectory => {
                eprintln!();
                eprintln!("Set it once with:");
                eprintln!("  geocatalog config set data.directory /path/to/data");
            }
            CliError::Ingest(IngestError::FileFailed { .. }) => {
                eprintln!();
                eprintln!("Nothing was written to the catalog.");
                eprintln!("Use --on-error skip to catalog the readable files only.");
            }
            CliError::Reconcile(ReconcileError::MetadataStoreMissing { .. }) => {
                eprintln!();
                eprintln!("The inventory extension can be changed with:");
                eprintln!("  geocatalog config set reconcile.inventory_extension <ext>");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::NoDataDirectory => write!(
                f,
                "No data directory: pass --data-dir or set data.directory"
            ),
            CliError::Catalog(e) => write!(f, "Catalog error: {}", e),
            CliError::Ingest(e) => write!(f, "Ingestion failed: {}", e),
            CliError::Reconcile(e) => write!(f, "Reconciliation failed: {}", e),
            CliError::Inspect { file, error } => {
                write!(f, "Failed to read '{}': {}", file.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog(e) => Some(e),
            CliError::Ingest(e) => Some(e),
            CliError::Reconcile(e) => Some(e),
            CliError::Inspect { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<IngestError> for CliError {
    fn from(e: IngestError) -> Self {
        CliError::Ingest(e)
    }
}

impl From<ReconcileError> for CliError {
    fn from(e: ReconcileError) -> Self {
        CliError::Reconcile(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CliError::NoDataDirectory.to_string(),
            "No data directory: pass --data-dir or set data.directory"
        );
        assert_eq!(
            CliError::Config("bad".to_string()).to_string(),
            "Configuration error: bad"
        );
    }

    #[test]
    fn test_config_file_error_conversion() {
        let err: CliError = ConfigFileError::InvalidValue {
            section: "ingest".to_string(),
            key: "on_error".to_string(),
            value: "retry".to_string(),
            reason: "must be skip or abort".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Config(ref msg) if msg.contains("ingest.on_error")));
    }
}
