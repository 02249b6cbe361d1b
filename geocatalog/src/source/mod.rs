//! Geospatial format drivers.
//!
//! Every supported container implements the [`GeoSource`] capability trait:
//! list its layers, read a layer's schema, and read a layer's attribute rows
//! with a given text encoding. [`open`] selects the driver from the file
//! extension and falls back to probing magic bytes.
//!
//! Drivers never read geometries. Only the attribute table, the geometry type
//! and the coordinate reference system are extracted.
//!
//! # Example
//!
//! ```ignore
//! use geocatalog::source;
//!
//! let source = source::open("/data/communes.shp".as_ref())?;
//! for layer in source.list_layers()? {
//!     let schema = source.read_schema(&layer)?;
//!     println!("{} ({}): {} fields", schema.name, schema.geometry, schema.fields.len());
//! }
//! ```

pub mod crs;
pub mod dbf;
mod geopackage;
mod shapefile;

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::encoding::TextEncoding;
use crate::geometry::GeometryKind;

pub use geopackage::GeopackageSource;
pub use shapefile::ShapefileSource;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// ESRI Shapefile (`.shp` with `.dbf`, `.prj`, `.cpg` companions).
    Shapefile,
    /// OGC GeoPackage (SQLite container, possibly many layers).
    Geopackage,
}

impl SourceFormat {
    /// Driver tag reported in layer metadata.
    pub fn driver(&self) -> &'static str {
        match self {
            SourceFormat::Shapefile => "ESRI Shapefile",
            SourceFormat::Geopackage => "GPKG",
        }
    }

    /// Format for a file extension (without the dot, case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "shp" => Some(SourceFormat::Shapefile),
            "gpkg" => Some(SourceFormat::Geopackage),
            _ => None,
        }
    }

    /// Format for a path, by extension first and by magic bytes otherwise.
    pub fn detect(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .or_else(|| Self::probe(path))
    }

    /// Identify a file from its leading bytes.
    pub fn probe(path: &Path) -> Option<Self> {
        let mut header = [0u8; 16];
        let mut file = File::open(path).ok()?;
        file.read_exact(&mut header).ok()?;

        if &header == b"SQLite format 3\0" {
            return Some(SourceFormat::Geopackage);
        }
        if i32::from_be_bytes([header[0], header[1], header[2], header[3]]) == 9994 {
            return Some(SourceFormat::Shapefile);
        }
        None
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver())
    }
}

/// Errors raised by format drivers.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file (or a required companion) could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No driver handles this file.
    #[error("Unsupported geospatial format: '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The file is not a well-formed instance of its format.
    #[error("Malformed {format} data in '{}': {message}", .path.display())]
    Malformed {
        path: PathBuf,
        format: SourceFormat,
        message: String,
    },

    /// The requested layer does not exist in the container.
    #[error("Layer '{layer}' not found in '{}'", .path.display())]
    LayerNotFound { path: PathBuf, layer: String },

    /// Text in the attribute table is not valid in the requested encoding.
    #[error("Record {record} of '{}' is not valid {encoding}", .path.display())]
    Decode {
        path: PathBuf,
        encoding: TextEncoding,
        record: usize,
    },

    /// The SQLite container could not be queried.
    #[error("SQLite error in '{}': {source}", .path.display())]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

impl SourceError {
    /// True when a different text encoding might succeed.
    pub fn is_decode(&self) -> bool {
        matches!(self, SourceError::Decode { .. })
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn sqlite(path: &Path, source: rusqlite::Error) -> Self {
        SourceError::Sqlite {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One attribute column as declared by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Source type tag (`str`, `str:80`, `int`, `float`, `date`, ...).
    pub type_tag: String,
}

impl Field {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }
}

/// Schema of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSchema {
    /// Layer name.
    pub name: String,
    /// Geometry type.
    pub geometry: GeometryKind,
    /// EPSG code of the layer CRS, when one could be resolved.
    pub epsg: Option<u32>,
    /// Attribute columns in source order (geometry excluded).
    pub fields: Vec<Field>,
}

/// A single cell of an attribute table.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(NaiveDate),
    Bytes(Vec<u8>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Real(value) => write!(f, "{}", value),
            FieldValue::Boolean(value) => write!(f, "{}", value),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldValue::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// A fully loaded attribute table.
///
/// Rows hold one value per entry of `columns`. The geometry column, if the
/// layer has one, is named but never loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub geometry_column: Option<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Table {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Capability interface implemented by every format driver.
pub trait GeoSource {
    /// Path of the opened file.
    fn path(&self) -> &Path;

    /// Container format.
    fn format(&self) -> SourceFormat;

    /// Layer names, in container order.
    fn list_layers(&self) -> Result<Vec<String>, SourceError>;

    /// Schema of `layer`.
    fn read_schema(&self, layer: &str) -> Result<LayerSchema, SourceError>;

    /// All attribute rows of `layer`, decoding text with `encoding`.
    ///
    /// Fails with [`SourceError::Decode`] at the first text value that is not
    /// valid in `encoding`.
    fn read_rows(&self, layer: &str, encoding: TextEncoding) -> Result<Table, SourceError>;

    /// Encoding the file declares for itself, if any.
    fn declared_encoding(&self) -> Option<TextEncoding> {
        None
    }

    /// File whose raw bytes are representative of the attribute text, for
    /// statistical sniffing.
    fn encoding_sample(&self) -> Option<PathBuf> {
        None
    }
}

/// Open `path` with the driver matching its format.
pub fn open(path: &Path) -> Result<Box<dyn GeoSource>, SourceError> {
    match SourceFormat::detect(path) {
        Some(SourceFormat::Shapefile) => Ok(Box::new(ShapefileSource::open(path)?)),
        Some(SourceFormat::Geopackage) => Ok(Box::new(GeopackageSource::open(path)?)),
        None => Err(SourceError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SourceFormat::from_extension("SHP"),
            Some(SourceFormat::Shapefile)
        );
        assert_eq!(
            SourceFormat::from_extension("gpkg"),
            Some(SourceFormat::Geopackage)
        );
        assert_eq!(SourceFormat::from_extension("dbf"), None);
    }

    #[test]
    fn test_probe_by_magic_bytes() {
        let temp = tempfile::TempDir::new().unwrap();

        let sqlite = temp.path().join("layers.bin");
        let mut bytes = b"SQLite format 3\0".to_vec();
        bytes.extend_from_slice(&[0u8; 84]);
        std::fs::write(&sqlite, &bytes).unwrap();
        assert_eq!(SourceFormat::detect(&sqlite), Some(SourceFormat::Geopackage));

        let shp = temp.path().join("roads.data");
        let mut bytes = 9994i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 96]);
        std::fs::write(&shp, &bytes).unwrap();
        assert_eq!(SourceFormat::detect(&shp), Some(SourceFormat::Shapefile));

        let other = temp.path().join("notes.txt");
        std::fs::write(&other, b"just some text here").unwrap();
        assert_eq!(SourceFormat::detect(&other), None);
    }

    #[test]
    fn test_open_rejects_unknown_format() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("readme.md");
        std::fs::write(&path, b"# nothing geospatial in here").unwrap();
        assert!(matches!(
            open(&path),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::Integer(-42).to_string(), "-42");
        assert_eq!(FieldValue::Real(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Boolean(true).to_string(), "true");
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2021, 3, 9).unwrap()).to_string(),
            "2021-03-09"
        );
        assert_eq!(FieldValue::Bytes(vec![0x0a, 0xff]).to_string(), "0aff");
    }
}
