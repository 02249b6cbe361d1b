//! ESRI Shapefile driver.
//!
//! A shapefile is a single layer spread over companion files sharing a stem:
//! `.shp` (geometry, only its header is read here), `.dbf` (attributes),
//! `.prj` (CRS as WKT) and `.cpg` (code page of the `.dbf`).

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::crs::epsg_from_user_input;
use super::dbf::DbfTable;
use super::{GeoSource, LayerSchema, SourceError, SourceFormat, Table};
use crate::encoding::TextEncoding;
use crate::geometry::GeometryKind;

const SHP_HEADER_LEN: usize = 100;
const SHP_FILE_CODE: i32 = 9994;

/// An opened shapefile.
#[derive(Debug, Clone)]
pub struct ShapefileSource {
    path: PathBuf,
    layer: String,
    geometry: GeometryKind,
}

impl ShapefileSource {
    /// Open `path` and read its `.shp` header.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let geometry = read_shape_type(path)?;
        let layer = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(file = %path.display(), layer = %layer, geometry = %geometry, "Opened shapefile");

        Ok(Self {
            path: path.to_path_buf(),
            layer,
            geometry,
        })
    }

    /// Path of the companion file with `extension`, matching either case.
    fn companion(&self, extension: &str) -> Option<PathBuf> {
        [
            extension.to_ascii_lowercase(),
            extension.to_ascii_uppercase(),
        ]
        .into_iter()
        .map(|ext| self.path.with_extension(ext))
        .find(|candidate| candidate.is_file())
    }

    fn dbf_path(&self) -> PathBuf {
        self.companion("dbf")
            .unwrap_or_else(|| self.path.with_extension("dbf"))
    }

    fn check_layer(&self, layer: &str) -> Result<(), SourceError> {
        if layer == self.layer {
            Ok(())
        } else {
            Err(SourceError::LayerNotFound {
                path: self.path.clone(),
                layer: layer.to_string(),
            })
        }
    }

    fn epsg(&self) -> Option<u32> {
        let prj = self.companion("prj")?;
        let wkt = match std::fs::read(&prj) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(file = %prj.display(), error = %e, "Failed to read projection file");
                return None;
            }
        };
        let epsg = epsg_from_user_input(&wkt);
        if epsg.is_none() {
            debug!(file = %prj.display(), "Could not identify an EPSG code for the projection");
        }
        epsg
    }
}

impl GeoSource for ShapefileSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Shapefile
    }

    fn list_layers(&self) -> Result<Vec<String>, SourceError> {
        Ok(vec![self.layer.clone()])
    }

    fn read_schema(&self, layer: &str) -> Result<LayerSchema, SourceError> {
        self.check_layer(layer)?;
        let dbf = DbfTable::open(&self.dbf_path())?;
        Ok(LayerSchema {
            name: self.layer.clone(),
            geometry: self.geometry,
            epsg: self.epsg(),
            fields: dbf.schema(),
        })
    }

    fn read_rows(&self, layer: &str, encoding: TextEncoding) -> Result<Table, SourceError> {
        self.check_layer(layer)?;
        let dbf = DbfTable::open(&self.dbf_path())?;
        let rows = dbf.read_records(encoding)?;
        Ok(Table {
            columns: dbf.fields().iter().map(|f| f.name.clone()).collect(),
            // Geometries live in the .shp; every dbf field is an attribute.
            geometry_column: None,
            rows,
        })
    }

    fn declared_encoding(&self) -> Option<TextEncoding> {
        let cpg = self.companion("cpg")?;
        let label = std::fs::read_to_string(&cpg).ok()?;
        let encoding = code_page_encoding(&label);
        if encoding.is_none() {
            warn!(file = %cpg.display(), code_page = %label.trim(), "Unrecognized code page");
        }
        encoding
    }

    fn encoding_sample(&self) -> Option<PathBuf> {
        Some(self.dbf_path())
    }
}

/// Encoding named by a `.cpg` file (`UTF-8`, `1252`, `ANSI 1252`, `88591`, ...).
fn code_page_encoding(label: &str) -> Option<TextEncoding> {
    let label = label.trim();
    let label = label
        .strip_prefix("ANSI ")
        .or_else(|| label.strip_prefix("ansi "))
        .unwrap_or(label);
    match label {
        "88591" | "8859-1" => Some(TextEncoding::Latin1),
        _ => TextEncoding::from_label(label),
    }
}

/// Read the shape type from the 100-byte `.shp` header.
fn read_shape_type(path: &Path) -> Result<GeometryKind, SourceError> {
    let malformed = |message: String| SourceError::Malformed {
        path: path.to_path_buf(),
        format: SourceFormat::Shapefile,
        message,
    };

    let mut header = [0u8; SHP_HEADER_LEN];
    let mut file = File::open(path).map_err(|e| SourceError::io(path, e))?;
    file.read_exact(&mut header)
        .map_err(|_| malformed("shp header truncated".to_string()))?;

    let file_code = i32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if file_code != SHP_FILE_CODE {
        return Err(malformed(format!("bad file code {}", file_code)));
    }

    let shape_type = i32::from_le_bytes([header[32], header[33], header[34], header[35]]);
    GeometryKind::from_shape_type(shape_type)
        .ok_or_else(|| malformed(format!("unknown shape type {}", shape_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::dbf::{write_table, DbfField};
    use crate::source::FieldValue;
    use tempfile::TempDir;

    fn shp_header(shape_type: i32) -> Vec<u8> {
        let mut header = vec![0u8; SHP_HEADER_LEN];
        header[0..4].copy_from_slice(&SHP_FILE_CODE.to_be_bytes());
        header[24..28].copy_from_slice(&((SHP_HEADER_LEN / 2) as i32).to_be_bytes());
        header[28..32].copy_from_slice(&1000i32.to_le_bytes());
        header[32..36].copy_from_slice(&shape_type.to_le_bytes());
        header
    }

    fn write_shapefile(dir: &Path, stem: &str, shape_type: i32, names: &[&[u8]]) -> PathBuf {
        let shp = dir.join(format!("{stem}.shp"));
        std::fs::write(&shp, shp_header(shape_type)).unwrap();

        let fields = vec![DbfField {
            name: "NOM".to_string(),
            kind: b'C',
            length: 24,
            decimals: 0,
        }];
        let records: Vec<_> = names
            .iter()
            .map(|name| (false, vec![name.to_vec()]))
            .collect();
        std::fs::write(dir.join(format!("{stem}.dbf")), write_table(&fields, &records)).unwrap();
        shp
    }

    #[test]
    fn test_single_layer_named_after_stem() {
        let temp = TempDir::new().unwrap();
        let shp = write_shapefile(temp.path(), "communes", 5, &[b"Dole".as_slice()]);
        let source = ShapefileSource::open(&shp).unwrap();

        assert_eq!(source.list_layers().unwrap(), vec!["communes"]);
        let schema = source.read_schema("communes").unwrap();
        assert_eq!(schema.geometry, GeometryKind::Polygon);
        assert_eq!(schema.epsg, None);
        assert_eq!(schema.fields[0].name, "NOM");
        assert_eq!(schema.fields[0].type_tag, "str:24");
    }

    #[test]
    fn test_prj_and_cpg_companions() {
        let temp = TempDir::new().unwrap();
        let shp = write_shapefile(temp.path(), "routes", 3, &[b"A36".as_slice()]);
        std::fs::write(
            temp.path().join("routes.prj"),
            r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("routes.cpg"), "1252\n").unwrap();

        let source = ShapefileSource::open(&shp).unwrap();
        assert_eq!(source.read_schema("routes").unwrap().epsg, Some(4326));
        assert_eq!(source.declared_encoding(), Some(TextEncoding::Windows1252));
        assert_eq!(source.encoding_sample(), Some(temp.path().join("routes.dbf")));
    }

    #[test]
    fn test_read_rows_with_encoding() {
        let temp = TempDir::new().unwrap();
        let shp = write_shapefile(temp.path(), "lieux", 1, &[b"Sa\xf4ne".as_slice(), b"Doubs".as_slice()]);
        let source = ShapefileSource::open(&shp).unwrap();

        assert!(source
            .read_rows("lieux", TextEncoding::Utf8)
            .unwrap_err()
            .is_decode());

        let table = source.read_rows("lieux", TextEncoding::Latin1).unwrap();
        assert_eq!(table.columns, vec!["NOM"]);
        assert_eq!(table.geometry_column, None);
        assert_eq!(table.rows[0][0], FieldValue::Text("Saône".to_string()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_field_named_geometry_is_an_attribute() {
        let temp = TempDir::new().unwrap();
        let shp = temp.path().join("zones.shp");
        std::fs::write(&shp, shp_header(5)).unwrap();
        let fields = vec![DbfField {
            name: "geometry".to_string(),
            kind: b'C',
            length: 8,
            decimals: 0,
        }];
        let records = vec![(false, vec![b"carre".to_vec()])];
        std::fs::write(temp.path().join("zones.dbf"), write_table(&fields, &records)).unwrap();

        let source = ShapefileSource::open(&shp).unwrap();
        let table = source.read_rows("zones", TextEncoding::Utf8).unwrap();
        let values = crate::values::ValueCatalog::from_table(&table, TextEncoding::Utf8);
        assert_eq!(values.get("geometry").unwrap(), ["carre"]);
    }

    #[test]
    fn test_unknown_layer() {
        let temp = TempDir::new().unwrap();
        let shp = write_shapefile(temp.path(), "a", 1, &[]);
        let source = ShapefileSource::open(&shp).unwrap();
        assert!(matches!(
            source.read_schema("b"),
            Err(SourceError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_bad_header() {
        let temp = TempDir::new().unwrap();
        let shp = temp.path().join("bad.shp");
        std::fs::write(&shp, vec![0u8; 100]).unwrap();
        assert!(matches!(
            ShapefileSource::open(&shp),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_code_page_labels() {
        assert_eq!(code_page_encoding("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(
            code_page_encoding("ANSI 1252"),
            Some(TextEncoding::Windows1252)
        );
        assert_eq!(code_page_encoding("88591"), Some(TextEncoding::Latin1));
        assert_eq!(code_page_encoding("gibberish"), None);
    }
}
