//! OGC GeoPackage driver.
//!
//! A GeoPackage is a SQLite database. Layers are listed in `gpkg_contents`,
//! their geometry column and type in `gpkg_geometry_columns`, and their CRS in
//! `gpkg_spatial_ref_sys`. The file is opened read-only.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::crs::epsg_from_user_input;
use super::{Field, FieldValue, GeoSource, LayerSchema, SourceError, SourceFormat, Table};
use crate::encoding::TextEncoding;
use crate::geometry::GeometryKind;

/// Geometry column registration of one layer.
#[derive(Debug, Clone)]
struct GeometryColumn {
    name: String,
    kind: GeometryKind,
    srs_id: Option<i64>,
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone)]
struct ColumnInfo {
    name: String,
    declared_type: String,
    primary_key: bool,
}

/// An opened GeoPackage.
pub struct GeopackageSource {
    path: PathBuf,
    conn: Connection,
}

impl std::fmt::Debug for GeopackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeopackageSource")
            .field("path", &self.path)
            .finish()
    }
}

impl GeopackageSource {
    /// Open `path` read-only and check that it carries a `gpkg_contents`
    /// table.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            ));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SourceError::sqlite(path, e))?;

        let has_contents: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'gpkg_contents'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(..) => SourceError::Malformed {
                    path: path.to_path_buf(),
                    format: SourceFormat::Geopackage,
                    message: e.to_string(),
                },
                other => SourceError::sqlite(path, other),
            })?;

        if !has_contents {
            return Err(SourceError::Malformed {
                path: path.to_path_buf(),
                format: SourceFormat::Geopackage,
                message: "missing gpkg_contents table".to_string(),
            });
        }

        debug!(file = %path.display(), "Opened GeoPackage");
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    fn sqlite_err(&self, err: rusqlite::Error) -> SourceError {
        SourceError::sqlite(&self.path, err)
    }

    /// The `srs_id` declared in `gpkg_contents` for `layer`, failing when the
    /// layer is not registered.
    fn contents_srs(&self, layer: &str) -> Result<Option<i64>, SourceError> {
        self.conn
            .query_row(
                "SELECT srs_id FROM gpkg_contents \
                 WHERE table_name = ?1 AND data_type IN ('features', 'attributes')",
                [layer],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .map_err(|e| self.sqlite_err(e))?
            .ok_or_else(|| SourceError::LayerNotFound {
                path: self.path.clone(),
                layer: layer.to_string(),
            })
    }

    fn geometry_column(&self, layer: &str) -> Result<Option<GeometryColumn>, SourceError> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master \
                 WHERE type = 'table' AND name = 'gpkg_geometry_columns'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| self.sqlite_err(e))?;
        if exists == 0 {
            return Ok(None);
        }

        self.conn
            .query_row(
                "SELECT column_name, geometry_type_name, z, srs_id \
                 FROM gpkg_geometry_columns WHERE table_name = ?1",
                [layer],
                |row| {
                    let type_name: String = row.get(1)?;
                    let z: i64 = row.get::<_, Option<i64>>(2)?.unwrap_or(0);
                    Ok(GeometryColumn {
                        name: row.get(0)?,
                        kind: GeometryKind::from_gpkg(&type_name, z),
                        srs_id: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| self.sqlite_err(e))
    }

    /// EPSG code for a `gpkg_spatial_ref_sys` entry.
    ///
    /// `-1` (undefined Cartesian) and `0` (undefined geographic) never map to
    /// a code.
    fn epsg(&self, srs_id: i64) -> Option<u32> {
        if srs_id <= 0 {
            return None;
        }

        let entry = self
            .conn
            .query_row(
                "SELECT organization, organization_coordsys_id, definition \
                 FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
                [srs_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional();

        let (organization, code, definition) = match entry {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(file = %self.path.display(), srs_id, "srs_id not registered");
                return None;
            }
            Err(e) => {
                debug!(file = %self.path.display(), srs_id, error = %e, "Failed to read spatial reference");
                return None;
            }
        };

        if organization.is_some_and(|org| org.eq_ignore_ascii_case("EPSG")) {
            if let Some(code) = code.and_then(|c| u32::try_from(c).ok()).filter(|c| *c > 0) {
                return Some(code);
            }
        }

        let epsg = definition.as_deref().and_then(epsg_from_user_input);
        if epsg.is_none() {
            debug!(file = %self.path.display(), srs_id, "Could not identify an EPSG code");
        }
        epsg
    }

    fn columns(&self, layer: &str) -> Result<Vec<ColumnInfo>, SourceError> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(layer));
        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.sqlite_err(e))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    primary_key: row.get::<_, i64>(5)? > 0,
                })
            })
            .map_err(|e| self.sqlite_err(e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.sqlite_err(e))?;
        Ok(columns)
    }

    /// Attribute columns of `layer`: everything except the geometry column and
    /// the integer primary key (the feature id).
    fn attribute_columns(
        &self,
        layer: &str,
        geometry: Option<&GeometryColumn>,
    ) -> Result<Vec<ColumnInfo>, SourceError> {
        let columns = self.columns(layer)?;
        Ok(columns
            .into_iter()
            .filter(|c| geometry.map_or(true, |g| !c.name.eq_ignore_ascii_case(&g.name)))
            .filter(|c| !(c.primary_key && c.declared_type.eq_ignore_ascii_case("INTEGER")))
            .collect())
    }
}

impl GeoSource for GeopackageSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Geopackage
    }

    fn list_layers(&self) -> Result<Vec<String>, SourceError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT table_name FROM gpkg_contents \
                 WHERE data_type IN ('features', 'attributes') ORDER BY rowid",
            )
            .map_err(|e| self.sqlite_err(e))?;
        let layers = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| self.sqlite_err(e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.sqlite_err(e))?;
        Ok(layers)
    }

    fn read_schema(&self, layer: &str) -> Result<LayerSchema, SourceError> {
        let contents_srs = self.contents_srs(layer)?;
        let geometry = self.geometry_column(layer)?;
        let fields = self
            .attribute_columns(layer, geometry.as_ref())?
            .into_iter()
            .map(|c| Field::new(c.name, type_tag(&c.declared_type)))
            .collect();

        let srs_id = geometry.as_ref().and_then(|g| g.srs_id).or(contents_srs);
        Ok(LayerSchema {
            name: layer.to_string(),
            geometry: geometry.as_ref().map_or(GeometryKind::None, |g| g.kind),
            epsg: srs_id.and_then(|id| self.epsg(id)),
            fields,
        })
    }

    fn read_rows(&self, layer: &str, encoding: TextEncoding) -> Result<Table, SourceError> {
        self.contents_srs(layer)?;
        let geometry = self.geometry_column(layer)?;
        let columns = self.attribute_columns(layer, geometry.as_ref())?;

        let mut table = Table {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            geometry_column: geometry.map(|g| g.name),
            rows: Vec::new(),
        };
        if columns.is_empty() {
            return Ok(table);
        }

        let booleans: Vec<bool> = columns
            .iter()
            .map(|c| c.declared_type.eq_ignore_ascii_case("BOOLEAN"))
            .collect();
        let select = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select, quote_identifier(layer));

        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.sqlite_err(e))?;
        let mut rows = stmt.query([]).map_err(|e| self.sqlite_err(e))?;
        let mut index = 0;
        while let Some(row) = rows.next().map_err(|e| SourceError::sqlite(&self.path, e))? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, is_bool) in booleans.iter().enumerate() {
                let raw = row.get_ref(i).map_err(|e| SourceError::sqlite(&self.path, e))?;
                let value = match raw {
                    ValueRef::Null => FieldValue::Null,
                    ValueRef::Integer(v) if *is_bool => FieldValue::Boolean(v != 0),
                    ValueRef::Integer(v) => FieldValue::Integer(v),
                    ValueRef::Real(v) => FieldValue::Real(v),
                    ValueRef::Text(bytes) => {
                        FieldValue::Text(encoding.decode(bytes).map_err(|_| SourceError::Decode {
                            path: self.path.clone(),
                            encoding,
                            record: index,
                        })?)
                    }
                    ValueRef::Blob(bytes) => FieldValue::Bytes(bytes.to_vec()),
                };
                values.push(value);
            }
            table.rows.push(values);
            index += 1;
        }

        Ok(table)
    }
}

/// Double-quote an SQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Source type tag for a declared GeoPackage column type.
fn type_tag(declared: &str) -> String {
    let declared = declared.trim().to_ascii_uppercase();
    static SIZED_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
    let sized = SIZED_TEXT.get_or_init(|| Regex::new(r"^TEXT\s*\(\s*(\d+)\s*\)$").ok());
    if let Some(pattern) = sized {
        if let Some(width) = pattern.captures(&declared).and_then(|c| c.get(1)) {
            return format!("str:{}", width.as_str());
        }
    }

    match declared.as_str() {
        "TEXT" | "" => "str",
        "INTEGER" | "INT" | "MEDIUMINT" | "SMALLINT" | "TINYINT" => "int",
        "REAL" | "FLOAT" | "DOUBLE" => "float",
        "BOOLEAN" => "bool",
        "DATE" => "date",
        "DATETIME" => "datetime",
        "BLOB" => "bytes",
        _ => "str",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GPKG_CORE: &str = "
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL, srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL, organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL, description TEXT);
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY, data_type TEXT NOT NULL,
            identifier TEXT UNIQUE, description TEXT DEFAULT '',
            last_change DATETIME, min_x DOUBLE, min_y DOUBLE, max_x DOUBLE, max_y DOUBLE,
            srs_id INTEGER);
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL, column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL, srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL, m TINYINT NOT NULL);
        INSERT INTO gpkg_spatial_ref_sys VALUES
            ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
            ('RGF93 / Lambert-93', 2154, 'EPSG', 2154, 'PROJCS[\"RGF93 / Lambert-93\"]', NULL),
            ('Custom', 100000, 'NONE', 100000,
             'GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]]]', NULL);
    ";

    fn fixture(dir: &Path) -> PathBuf {
        let path = dir.join("bdtopo.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(GPKG_CORE).unwrap();
        conn.execute_batch(
            "
            CREATE TABLE nomenclature (fid INTEGER PRIMARY KEY, code TEXT, libelle TEXT(40));
            INSERT INTO nomenclature VALUES (1, 'A', 'Autoroute');
            INSERT INTO gpkg_contents (table_name, data_type, srs_id)
                VALUES ('nomenclature', 'attributes', 0);

            CREATE TABLE troncons (
                fid INTEGER PRIMARY KEY, geom BLOB, nature TEXT(20),
                largeur REAL, voies INTEGER, prive BOOLEAN, maj DATE);
            INSERT INTO troncons VALUES (1, x'00', 'Route', 7.5, 2, 0, '2021-03-09');
            INSERT INTO troncons VALUES (2, x'00', 'Chemin', NULL, 1, 1, NULL);
            INSERT INTO gpkg_contents (table_name, data_type, srs_id)
                VALUES ('troncons', 'features', 2154);
            INSERT INTO gpkg_geometry_columns VALUES ('troncons', 'geom', 'MULTILINESTRING', 2154, 0, 0);

            CREATE TABLE sites (fid INTEGER PRIMARY KEY, geom BLOB, nom TEXT);
            INSERT INTO gpkg_contents (table_name, data_type, srs_id)
                VALUES ('sites', 'features', 100000);
            INSERT INTO gpkg_geometry_columns VALUES ('sites', 'geom', 'POINT', 100000, 1, 0);
            ",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_layers_in_table_order() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        assert_eq!(
            source.list_layers().unwrap(),
            vec!["nomenclature", "troncons", "sites"]
        );
    }

    #[test]
    fn test_feature_schema() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        let schema = source.read_schema("troncons").unwrap();

        assert_eq!(schema.geometry, GeometryKind::MultiLinestring);
        assert_eq!(schema.epsg, Some(2154));
        let fields: Vec<_> = schema
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.type_tag.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("nature", "str:20"),
                ("largeur", "float"),
                ("voies", "int"),
                ("prive", "bool"),
                ("maj", "date"),
            ]
        );
    }

    #[test]
    fn test_attribute_table_has_no_geometry() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        let schema = source.read_schema("nomenclature").unwrap();
        assert_eq!(schema.geometry, GeometryKind::None);
        assert_eq!(schema.epsg, None);
    }

    #[test]
    fn test_epsg_from_definition_when_not_epsg_organization() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        let schema = source.read_schema("sites").unwrap();
        assert_eq!(schema.geometry, GeometryKind::PointZ);
        assert_eq!(schema.epsg, Some(4326));
    }

    #[test]
    fn test_read_rows() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        let table = source.read_rows("troncons", TextEncoding::Utf8).unwrap();

        assert_eq!(table.geometry_column.as_deref(), Some("geom"));
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.rows[0][0], FieldValue::Text("Route".to_string()));
        assert_eq!(table.rows[0][1], FieldValue::Real(7.5));
        assert_eq!(table.rows[0][3], FieldValue::Boolean(false));
        assert_eq!(table.rows[1][1], FieldValue::Null);
        assert_eq!(table.rows[1][3], FieldValue::Boolean(true));
    }

    #[test]
    fn test_missing_layer() {
        let temp = TempDir::new().unwrap();
        let source = GeopackageSource::open(&fixture(temp.path())).unwrap();
        assert!(matches!(
            source.read_schema("batiments"),
            Err(SourceError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_plain_sqlite_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT);").unwrap();
        drop(conn);

        assert!(matches!(
            GeopackageSource::open(&path),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(type_tag("TEXT(80)"), "str:80");
        assert_eq!(type_tag("text"), "str");
        assert_eq!(type_tag("MEDIUMINT"), "int");
        assert_eq!(type_tag("DOUBLE"), "float");
        assert_eq!(type_tag("DATETIME"), "datetime");
        assert_eq!(type_tag("BLOB"), "bytes");
        assert_eq!(type_tag("GEOMETRY"), "str");
    }
}
