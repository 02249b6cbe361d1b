//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::encoding::TextEncoding;
use crate::ingest::FailurePolicy;
use crate::reconcile::MatchKey;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub data: DataSettings,
    pub catalog: CatalogSettings,
    pub encoding: EncodingSettings,
    pub ingest: IngestSettings,
    pub reconcile: ReconcileSettings,
    pub logging: LoggingSettings,
}

/// Where the datasets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSettings {
    /// Root directory scanned recursively. Unset until configured.
    pub directory: Option<PathBuf>,
    /// Data file extensions, without the dot.
    pub extensions: Vec<String>,
}

/// Catalog store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// SQLite file holding the catalog.
    pub path: PathBuf,
}

/// Attribute table decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingSettings {
    /// Encodings tried in order before sniffing.
    pub candidates: Vec<TextEncoding>,
    /// Confidence a sniffed guess must exceed to be tried.
    pub min_confidence: f32,
    /// Leading bytes of a file handed to the sniffer.
    pub sample_bytes: usize,
}

/// Ingestion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// What to do with a file that cannot be read.
    pub on_error: FailurePolicy,
}

/// Inventory reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Extension of the inventory database.
    pub inventory_extension: String,
    /// Inventory table listing datasets.
    pub table: String,
    /// Column of `table` holding dataset names.
    pub name_column: String,
    /// Part of the file name compared with inventory names.
    pub match_on: MatchKey,
    /// Where reports are written. Defaults to the data directory.
    pub report_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file, truncated at the start of every command.
    pub file: PathBuf,
}
