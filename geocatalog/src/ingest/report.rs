//! Ingestion run report.

use std::fmt;
use std::path::PathBuf;

use crate::encoding::TextEncoding;
use crate::geometry::GeometryKind;

/// One ingested layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub file: PathBuf,
    pub layer: String,
    pub driver: String,
    pub geometry: GeometryKind,
    pub epsg: Option<u32>,
    /// Encoding the attribute table was decoded with.
    pub encoding: TextEncoding,
    /// Number of attributes.
    pub attributes: usize,
    /// Number of distinct values inserted.
    pub values: usize,
}

/// A file skipped under the skip policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of a committed ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub layers: Vec<LayerSummary>,
    /// Files holding no layer with geometry.
    pub without_layer: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl IngestReport {
    /// Total distinct values inserted.
    pub fn total_values(&self) -> usize {
        self.layers.iter().map(|l| l.values).sum()
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ingested {} layer(s), {} distinct value(s)",
            self.layers.len(),
            self.total_values()
        )?;
        for layer in &self.layers {
            let epsg = layer
                .epsg
                .map_or_else(|| "unknown".to_string(), |code| format!("EPSG:{}", code));
            writeln!(
                f,
                "  {:<32} {:<16} {:<12} {:>4} attrs {:>7} values  [{}]",
                layer.layer,
                layer.geometry.as_str(),
                epsg,
                layer.attributes,
                layer.values,
                layer.encoding
            )?;
        }
        if !self.without_layer.is_empty() {
            writeln!(f, "No usable layer in {} file(s):", self.without_layer.len())?;
            for file in &self.without_layer {
                writeln!(f, "  {}", file.display())?;
            }
        }
        if !self.failures.is_empty() {
            writeln!(f, "Skipped {} file(s):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  {}: {}", failure.file.display(), failure.reason)?;
            }
        }
        Ok(())
    }
}
