//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and the construction
//! of library components from configuration, so command handlers only deal
//! with their own flags.

use std::path::{Path, PathBuf};

use tracing::info;

use geocatalog::catalog::SqliteCatalog;
use geocatalog::config::ConfigFile;
use geocatalog::discovery::ExtensionSet;
use geocatalog::encoding::EncodingResolver;
use geocatalog::ingest::CatalogLoader;
use geocatalog::logging::{init_logging, LogOptions, LoggingGuard};
use geocatalog::reconcile::Reconciler;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// `debug` forces debug-level logging regardless of `RUST_LOG` and
    /// mirrors events to stdout.
    pub fn with_debug(debug: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let options = LogOptions {
            debug,
            stdout: debug,
        };
        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("geocatalog v{}", geocatalog::VERSION);
        info!(log = %self.config.logging.file.display(), "geocatalog CLI: {} command", command);
    }

    /// The data directory: the flag if given, else the configured one.
    pub fn data_directory(&self, flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
        flag.or_else(|| self.config.data.directory.clone())
            .ok_or(CliError::NoDataDirectory)
    }

    /// Configured data file extensions.
    pub fn data_extensions(&self) -> ExtensionSet {
        ExtensionSet::new(&self.config.data.extensions)
    }

    /// Encoding resolver built from `[encoding]`.
    pub fn resolver(&self) -> EncodingResolver {
        let settings = &self.config.encoding;
        EncodingResolver::new(settings.candidates.clone())
            .with_min_confidence(settings.min_confidence)
            .with_sample_bytes(settings.sample_bytes)
    }

    /// Catalog loader built from `[data]`, `[encoding]` and `[ingest]`.
    pub fn loader(&self) -> CatalogLoader {
        CatalogLoader::new(self.resolver())
            .with_extensions(self.data_extensions())
            .with_failure_policy(self.config.ingest.on_error)
    }

    /// Reconciler built from `[data]` and `[reconcile]`.
    pub fn reconciler(&self) -> Reconciler {
        let settings = &self.config.reconcile;
        Reconciler::default()
            .with_data_extensions(self.data_extensions())
            .with_inventory_extension(settings.inventory_extension.as_str())
            .with_table(settings.table.as_str())
            .with_name_column(settings.name_column.as_str())
            .with_match_key(settings.match_on)
    }

    /// Open the catalog at `flag`, else at the configured path.
    pub fn open_catalog(&self, flag: Option<&Path>) -> Result<SqliteCatalog, CliError> {
        let path = flag.unwrap_or(&self.config.catalog.path);
        info!(catalog = %path.display(), "Opening catalog");
        Ok(SqliteCatalog::open(path)?)
    }
}
