//! Semicolon-delimited reconciliation reports.

use std::path::{Path, PathBuf};

use tracing::info;

use super::{Reconciliation, ReconcileError};

/// Disk-side report file name.
pub const FILES_REPORT: &str = "files.csv";
/// Inventory-side report file name.
pub const METADATA_REPORT: &str = "metadata.csv";

const DELIMITER: u8 = b';';

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn write_csv<F>(path: &Path, fill: F) -> Result<(), ReconcileError>
where
    F: FnOnce(&mut csv::Writer<std::fs::File>) -> Result<(), csv::Error>,
{
    let wrap = |source| ReconcileError::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(wrap)?;
    fill(&mut writer).map_err(wrap)?;
    writer.flush().map_err(|e| wrap(e.into()))?;
    Ok(())
}

impl Reconciliation {
    /// Write `files.csv` and `metadata.csv` into `directory`.
    ///
    /// Returns the two paths, disk report first.
    pub fn export(&self, directory: &Path) -> Result<(PathBuf, PathBuf), ReconcileError> {
        let files_path = directory.join(FILES_REPORT);
        write_csv(&files_path, |writer| {
            writer.write_record([
                "filepath",
                "filename",
                "filename_without_extension",
                "extension",
                "in_metadata",
            ])?;
            for row in &self.files {
                let path = row.file.path.to_string_lossy();
                writer.write_record([
                    &*path,
                    row.file.file_name.as_str(),
                    row.file.stem.as_str(),
                    row.file.extension.as_str(),
                    flag(row.in_metadata),
                ])?;
            }
            Ok(())
        })?;

        let metadata_path = directory.join(METADATA_REPORT);
        write_csv(&metadata_path, |writer| {
            let mut header: Vec<&str> = self.inventory.columns.iter().map(String::as_str).collect();
            header.push("on_disk");
            writer.write_record(&header)?;
            for (row, on_disk) in self.inventory.rows.iter().zip(&self.on_disk) {
                let mut record: Vec<&str> = row.iter().map(String::as_str).collect();
                record.push(flag(*on_disk));
                writer.write_record(&record)?;
            }
            Ok(())
        })?;

        info!(
            files = %files_path.display(),
            metadata = %metadata_path.display(),
            "Reconciliation reports written"
        );
        Ok((files_path, metadata_path))
    }
}
