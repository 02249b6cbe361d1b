//! Catalog ingestion.
//!
//! [`CatalogLoader::run`] performs one full-replace ingestion of a data
//! directory:
//!
//! 1. discover the data files (recursive, extension filtered, sorted)
//! 2. clear the catalog
//! 3. for each file, read the layer schema and the distinct attribute values,
//!    then write the geometry type, layer, attribute types, attributes and
//!    values
//! 4. commit
//!
//! Everything happens inside one [`UnitOfWork`], so an aborted run leaves
//! the catalog as it was.

mod report;

pub use report::{FileFailure, IngestReport, LayerSummary};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::catalog::{CatalogError, CatalogWriter, UnitOfWork};
use crate::discovery::{self, DiscoveryError, ExtensionSet};
use crate::encoding::{DecodeError, EncodingResolver, ResolveError};
use crate::schema::{read_layer_metadata, LayerMetadata, SchemaParseError};
use crate::source;
use crate::types::to_storage_type;
use crate::values::{extract_values, ValueCatalog};

/// Default data file extensions.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["shp", "gpkg"];

/// What to do when a single file cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, record it in the report and continue.
    #[default]
    Skip,
    /// End the run with an error; nothing is committed.
    Abort,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Skip => "skip",
            FailurePolicy::Abort => "abort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!("expected 'skip' or 'abort', got '{}'", other)),
        }
    }
}

/// Why a single file could not be ingested.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Schema(#[from] SchemaParseError),
}

/// Errors ending an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A file failed under [`FailurePolicy::Abort`].
    #[error("Ingestion aborted on '{}': {source}", .file.display())]
    FileFailed {
        file: PathBuf,
        #[source]
        source: FileError,
    },
}

/// Everything read from one file, before any write.
#[derive(Debug, Clone)]
pub struct LayerExtract {
    pub metadata: LayerMetadata,
    pub values: ValueCatalog,
}

/// Runs ingestion over a directory.
pub struct CatalogLoader {
    resolver: EncodingResolver,
    extensions: ExtensionSet,
    failure_policy: FailurePolicy,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new(EncodingResolver::default())
    }
}

impl CatalogLoader {
    pub fn new(resolver: EncodingResolver) -> Self {
        Self {
            resolver,
            extensions: ExtensionSet::new(DEFAULT_EXTENSIONS),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Ingest every data file under `root` and commit `uow`.
    ///
    /// On error `uow` is dropped uncommitted.
    pub fn run<U: UnitOfWork>(&self, root: &Path, mut uow: U) -> Result<IngestReport, IngestError> {
        let files = discovery::discover(root, &self.extensions)?;
        info!(
            root = %root.display(),
            files = files.len(),
            policy = %self.failure_policy,
            "Starting ingestion"
        );

        uow.clear()?;

        let mut report = IngestReport::default();
        for file in files {
            match self.extract(&file) {
                Ok(Some(extract)) => {
                    let summary = write_layer(&mut uow, &file, &extract)?;
                    info!(
                        file = %file.display(),
                        layer = %summary.layer,
                        attributes = summary.attributes,
                        values = summary.values,
                        "Layer ingested"
                    );
                    report.layers.push(summary);
                }
                Ok(None) => report.without_layer.push(file),
                Err(source) => match self.failure_policy {
                    FailurePolicy::Skip => {
                        warn!(file = %file.display(), error = %source, "Skipping file");
                        report.failures.push(FileFailure {
                            file,
                            reason: source.to_string(),
                        });
                    }
                    FailurePolicy::Abort => {
                        return Err(IngestError::FileFailed { file, source });
                    }
                },
            }
        }

        uow.commit()?;
        info!(
            layers = report.layers.len(),
            skipped = report.failures.len(),
            without_layer = report.without_layer.len(),
            "Ingestion committed"
        );
        Ok(report)
    }

    /// Read the schema and distinct values of the default layer of `path`.
    ///
    /// `Ok(None)` when the file holds no layer with geometry.
    pub fn extract(&self, path: &Path) -> Result<Option<LayerExtract>, FileError> {
        self.extract_layer(path, None)
    }

    /// Like [`extract`](Self::extract), for a named layer when `layer` is set.
    pub fn extract_layer(
        &self,
        path: &Path,
        layer: Option<&str>,
    ) -> Result<Option<LayerExtract>, FileError> {
        let source = source::open(path).map_err(|e| SchemaParseError::new(path, e))?;
        let Some(metadata) = read_layer_metadata(source.as_ref(), layer)? else {
            return Ok(None);
        };

        let values = match extract_values(&self.resolver, source.as_ref(), &metadata.layer_name) {
            Ok(values) => values,
            Err(ResolveError::Decode(e)) => return Err(e.into()),
            Err(ResolveError::Source(e)) => return Err(SchemaParseError::new(path, e).into()),
        };

        Ok(Some(LayerExtract { metadata, values }))
    }
}

/// Write one extracted layer.
fn write_layer<W: CatalogWriter>(
    writer: &mut W,
    file: &Path,
    extract: &LayerExtract,
) -> Result<LayerSummary, CatalogError> {
    let metadata = &extract.metadata;
    let geometry = writer.upsert_geometry_type(metadata.geometry)?;
    let layer = writer.upsert_geolayer(&metadata.layer_name, metadata.epsg, geometry)?;

    let mut values = 0;
    for field in &metadata.attributes {
        let storage = writer.upsert_attribute_type(&to_storage_type(&field.type_tag))?;
        let attribute = writer.upsert_attribute(layer, &field.name, storage)?;
        for content in extract.values.get(&field.name).unwrap_or_default() {
            if writer.insert_attribute_value(layer, attribute, content)? {
                values += 1;
            }
        }
    }

    Ok(LayerSummary {
        file: file.to_path_buf(),
        layer: metadata.layer_name.clone(),
        driver: metadata.driver.clone(),
        geometry: metadata.geometry,
        epsg: metadata.epsg,
        encoding: extract.values.encoding,
        attributes: metadata.attributes.len(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("skip".parse::<FailurePolicy>(), Ok(FailurePolicy::Skip));
        assert_eq!("ABORT".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Skip);
    }

    #[test]
    fn test_missing_directory_fails_before_clearing() {
        let mut catalog = crate::catalog::SqliteCatalog::open_in_memory().unwrap();
        let uow = catalog.begin().unwrap();
        let err = CatalogLoader::default()
            .run(Path::new("/nonexistent/geocatalog/data"), uow)
            .unwrap_err();
        assert!(matches!(err, IngestError::Discovery(_)));
    }
}
