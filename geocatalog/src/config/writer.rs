//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let data_directory = config
        .data
        .directory
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let report_dir = config
        .reconcile
        .report_dir
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let candidates = config
        .encoding
        .candidates
        .iter()
        .map(|e| e.label())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"[data]
; Root directory scanned recursively for datasets
; Example: directory = /srv/geodata
directory = {}
; Data file extensions (comma-separated)
extensions = {}

[catalog]
; SQLite file holding the catalog (created if missing)
path = {}

[encoding]
; Encodings tried in order when decoding attribute tables
candidates = {}
; A statistically sniffed encoding is tried last, only above this confidence (0-1)
min_confidence = {}
; Leading bytes of a file handed to the sniffer
sample_bytes = {}

[ingest]
; What to do with a file that cannot be read:
;   skip  - log it, report it, keep going
;   abort - stop the run, nothing is written
on_error = {}

[reconcile]
; Extension of the metadata inventory database, found in the data directory
inventory_extension = {}
; Inventory table and the column holding dataset names
table = {}
name_column = {}
; Compare inventory names with the file name (filename) or without extension (stem)
match_on = {}
; Where files.csv and metadata.csv are written (empty = data directory)
report_dir = {}

[logging]
; Log file, truncated at the start of every command
file = {}
"#,
        data_directory,
        config.data.extensions.join(", "),
        path_to_string(&config.catalog.path),
        candidates,
        config.encoding.min_confidence,
        config.encoding.sample_bytes,
        config.ingest.on_error,
        config.reconcile.inventory_extension,
        config.reconcile.table,
        config.reconcile.name_column,
        config.reconcile.match_on,
        report_dir,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
pub(super) fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
