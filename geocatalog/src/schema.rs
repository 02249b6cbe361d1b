//! Layer schema extraction.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::geometry::GeometryKind;
use crate::source::{self, Field, GeoSource, SourceError};
use crate::values::unique_column_names;

/// Errors from schema extraction. Fatal for the file concerned.
#[derive(Debug, thiserror::Error)]
#[error("Failed to read the schema of '{}': {source}", .file.display())]
pub struct SchemaParseError {
    pub file: PathBuf,
    #[source]
    pub source: SourceError,
}

impl SchemaParseError {
    pub fn new(file: &Path, source: SourceError) -> Self {
        Self {
            file: file.to_path_buf(),
            source,
        }
    }
}

/// What the catalog records about one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMetadata {
    /// Layer name.
    pub layer_name: String,
    /// Driver tag (`ESRI Shapefile`, `GPKG`).
    pub driver: String,
    /// EPSG code, `None` when the CRS could not be identified.
    pub epsg: Option<u32>,
    /// Attribute columns in source order, names deduplicated.
    pub attributes: Vec<Field>,
    /// Geometry type.
    pub geometry: GeometryKind,
}

/// Pick the layer to catalog.
///
/// An explicit `requested` layer must exist. Otherwise the first layer with a
/// geometry wins; `Ok(None)` means the container has none.
pub fn select_layer(
    source: &dyn GeoSource,
    requested: Option<&str>,
) -> Result<Option<String>, SourceError> {
    let layers = source.list_layers()?;

    if let Some(name) = requested {
        return if layers.iter().any(|layer| layer == name) {
            Ok(Some(name.to_string()))
        } else {
            Err(SourceError::LayerNotFound {
                path: source.path().to_path_buf(),
                layer: name.to_string(),
            })
        };
    }

    for layer in layers {
        let schema = source.read_schema(&layer)?;
        if schema.geometry.has_geometry() {
            return Ok(Some(layer));
        }
        debug!(file = %source.path().display(), layer = %layer, "Skipping layer without geometry");
    }
    Ok(None)
}

/// Read the metadata of `layer` (or of the default layer) from an opened
/// source.
pub fn read_layer_metadata(
    source: &dyn GeoSource,
    layer: Option<&str>,
) -> Result<Option<LayerMetadata>, SchemaParseError> {
    let wrap = |e| SchemaParseError::new(source.path(), e);

    let Some(layer) = select_layer(source, layer).map_err(wrap)? else {
        info!(file = %source.path().display(), "No layer with geometry, nothing to catalog");
        return Ok(None);
    };

    let schema = source.read_schema(&layer).map_err(wrap)?;
    let names: Vec<String> = schema.fields.iter().map(|f| f.name.clone()).collect();
    let attributes = unique_column_names(&names)
        .into_iter()
        .zip(schema.fields)
        .map(|(name, field)| Field::new(name, field.type_tag))
        .collect();

    Ok(Some(LayerMetadata {
        layer_name: schema.name,
        driver: source.format().driver().to_string(),
        epsg: schema.epsg,
        attributes,
        geometry: schema.geometry,
    }))
}

/// Open `path` and extract the metadata of `layer` (or of the default layer).
pub fn extract_schema(
    path: &Path,
    layer: Option<&str>,
) -> Result<Option<LayerMetadata>, SchemaParseError> {
    let source = source::open(path).map_err(|e| SchemaParseError::new(path, e))?;
    read_layer_metadata(source.as_ref(), layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::source::{LayerSchema, SourceFormat, Table};

    /// In-memory source with fixed layers.
    struct StubSource {
        layers: Vec<LayerSchema>,
    }

    impl GeoSource for StubSource {
        fn path(&self) -> &Path {
            Path::new("stub.gpkg")
        }

        fn format(&self) -> SourceFormat {
            SourceFormat::Geopackage
        }

        fn list_layers(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.layers.iter().map(|l| l.name.clone()).collect())
        }

        fn read_schema(&self, layer: &str) -> Result<LayerSchema, SourceError> {
            self.layers
                .iter()
                .find(|l| l.name == layer)
                .cloned()
                .ok_or_else(|| SourceError::LayerNotFound {
                    path: PathBuf::from("stub.gpkg"),
                    layer: layer.to_string(),
                })
        }

        fn read_rows(&self, _layer: &str, _encoding: TextEncoding) -> Result<Table, SourceError> {
            Ok(Table::default())
        }
    }

    fn layer(name: &str, geometry: GeometryKind, fields: &[(&str, &str)]) -> LayerSchema {
        LayerSchema {
            name: name.to_string(),
            geometry,
            epsg: Some(2154),
            fields: fields.iter().map(|(n, t)| Field::new(*n, *t)).collect(),
        }
    }

    fn stub() -> StubSource {
        StubSource {
            layers: vec![
                layer("codes", GeometryKind::None, &[("code", "str")]),
                layer(
                    "parcelles",
                    GeometryKind::MultiPolygon,
                    &[("id", "int"), ("nom", "str:50"), ("nom", "str:10")],
                ),
            ],
        }
    }

    #[test]
    fn test_default_layer_skips_tables_without_geometry() {
        let metadata = read_layer_metadata(&stub(), None).unwrap().unwrap();
        assert_eq!(metadata.layer_name, "parcelles");
        assert_eq!(metadata.driver, "GPKG");
        assert_eq!(metadata.epsg, Some(2154));
        assert_eq!(metadata.geometry, GeometryKind::MultiPolygon);
    }

    #[test]
    fn test_attribute_names_are_deduplicated() {
        let metadata = read_layer_metadata(&stub(), None).unwrap().unwrap();
        assert_eq!(
            metadata.attributes,
            vec![
                Field::new("id", "int"),
                Field::new("nom", "str:50"),
                Field::new("nom_1", "str:10"),
            ]
        );
    }

    #[test]
    fn test_explicit_layer_may_lack_geometry() {
        let metadata = read_layer_metadata(&stub(), Some("codes")).unwrap().unwrap();
        assert_eq!(metadata.geometry, GeometryKind::None);
    }

    #[test]
    fn test_missing_explicit_layer_is_an_error() {
        let err = read_layer_metadata(&stub(), Some("batiments")).unwrap_err();
        assert!(matches!(err.source, SourceError::LayerNotFound { .. }));
        assert_eq!(err.file, PathBuf::from("stub.gpkg"));
    }

    #[test]
    fn test_no_geometry_layer_yields_none() {
        let source = StubSource {
            layers: vec![layer("codes", GeometryKind::None, &[])],
        };
        assert_eq!(read_layer_metadata(&source, None).unwrap(), None);
    }
}
