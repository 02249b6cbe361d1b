//! Default values for all configuration settings.

use super::file::config_directory;
use super::settings::*;
use crate::encoding::{default_candidates, DEFAULT_MIN_CONFIDENCE, DEFAULT_SAMPLE_BYTES};
use crate::ingest::{FailurePolicy, DEFAULT_EXTENSIONS};
use crate::logging::default_log_file;
use crate::reconcile::{
    MatchKey, DEFAULT_INVENTORY_EXTENSION, DEFAULT_NAME_COLUMN, DEFAULT_TABLE,
};

/// Default catalog file name, inside the config directory.
pub const DEFAULT_CATALOG_FILE: &str = "catalog.sqlite";

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = config_directory();

        Self {
            data: DataSettings {
                directory: None,
                extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            },
            catalog: CatalogSettings {
                path: config_dir.join(DEFAULT_CATALOG_FILE),
            },
            encoding: EncodingSettings {
                candidates: default_candidates(),
                min_confidence: DEFAULT_MIN_CONFIDENCE,
                sample_bytes: DEFAULT_SAMPLE_BYTES,
            },
            ingest: IngestSettings {
                on_error: FailurePolicy::default(),
            },
            reconcile: ReconcileSettings {
                inventory_extension: DEFAULT_INVENTORY_EXTENSION.to_string(),
                table: DEFAULT_TABLE.to_string(),
                name_column: DEFAULT_NAME_COLUMN.to_string(),
                match_on: MatchKey::default(),
                report_dir: None,
            },
            logging: LoggingSettings {
                file: config_dir.join(default_log_file()),
            },
        }
    }
}
