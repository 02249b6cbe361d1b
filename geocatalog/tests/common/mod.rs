//! Fixture builders shared by the integration tests.
//!
//! Shapefiles are written byte by byte (100-byte `.shp` header plus a dBASE
//! table), GeoPackages are created with rusqlite.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use geocatalog::source::dbf::DbfField;
use rusqlite::Connection;

pub const LAMBERT_93_WKT: &str = r#"PROJCS["RGF93 / Lambert-93",GEOGCS["RGF93",DATUM["Reseau_Geodesique_Francais_1993",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic_2SP"],UNIT["metre",1],AUTHORITY["EPSG","2154"]]"#;

pub const SHAPE_POLYGON: i32 = 5;
pub const SHAPE_POLYLINE: i32 = 3;

/// A character field of `length` bytes.
pub fn text_field(name: &str, length: usize) -> DbfField {
    DbfField {
        name: name.to_string(),
        kind: b'C',
        length,
        decimals: 0,
    }
}

/// An integer-valued numeric field.
pub fn int_field(name: &str, length: usize) -> DbfField {
    DbfField {
        name: name.to_string(),
        kind: b'N',
        length,
        decimals: 0,
    }
}

/// Builder for a Shapefile with its companions.
pub struct ShapefileFixture {
    stem: String,
    shape_type: i32,
    fields: Vec<DbfField>,
    records: Vec<Vec<Vec<u8>>>,
    prj: Option<String>,
    cpg: Option<String>,
}

impl ShapefileFixture {
    pub fn new(stem: &str, shape_type: i32) -> Self {
        Self {
            stem: stem.to_string(),
            shape_type,
            fields: Vec::new(),
            records: Vec::new(),
            prj: None,
            cpg: None,
        }
    }

    pub fn field(mut self, field: DbfField) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a record of already-encoded cell bytes.
    pub fn record(mut self, cells: &[&[u8]]) -> Self {
        self.records.push(cells.iter().map(|c| c.to_vec()).collect());
        self
    }

    pub fn prj(mut self, wkt: &str) -> Self {
        self.prj = Some(wkt.to_string());
        self
    }

    pub fn cpg(mut self, code_page: &str) -> Self {
        self.cpg = Some(code_page.to_string());
        self
    }

    /// Write the files into `dir`, returning the `.shp` path.
    pub fn write(self, dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let shp = dir.join(format!("{}.shp", self.stem));
        fs::write(&shp, shp_header(self.shape_type)).unwrap();

        let records: Vec<(bool, Vec<Vec<u8>>)> =
            self.records.into_iter().map(|r| (false, r)).collect();
        fs::write(
            dir.join(format!("{}.dbf", self.stem)),
            dbf_bytes(&self.fields, &records),
        )
        .unwrap();

        if let Some(wkt) = self.prj {
            fs::write(dir.join(format!("{}.prj", self.stem)), wkt).unwrap();
        }
        if let Some(code_page) = self.cpg {
            fs::write(dir.join(format!("{}.cpg", self.stem)), code_page).unwrap();
        }
        shp
    }
}

/// A dBASE III table: 32-byte header, 32-byte descriptors, `0x0D`, then
/// fixed-width records flagged `' '` (live) or `'*'` (deleted), then `0x1A`.
pub fn dbf_bytes(fields: &[DbfField], records: &[(bool, Vec<Vec<u8>>)]) -> Vec<u8> {
    let header_len = 32 + fields.len() * 32 + 1;
    let record_len = 1 + fields.iter().map(|f| f.length).sum::<usize>();

    let mut out = vec![0x03, 124, 1, 1];
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(&(record_len as u16).to_le_bytes());
    out.resize(32, 0);

    for field in fields {
        let mut descriptor = [0u8; 32];
        let name = field.name.as_bytes();
        descriptor[..name.len().min(10)].copy_from_slice(&name[..name.len().min(10)]);
        descriptor[11] = field.kind;
        descriptor[16] = field.length as u8;
        descriptor[17] = field.decimals as u8;
        out.extend_from_slice(&descriptor);
    }
    out.push(0x0D);

    for (deleted, cells) in records {
        out.push(if *deleted { b'*' } else { b' ' });
        for (field, value) in fields.iter().zip(cells) {
            let mut cell = vec![b' '; field.length];
            let len = value.len().min(field.length);
            if field.kind == b'C' {
                cell[..len].copy_from_slice(&value[..len]);
            } else {
                cell[field.length - len..].copy_from_slice(&value[..len]);
            }
            out.extend_from_slice(&cell);
        }
    }
    out.push(0x1A);
    out
}

/// Main file header of an empty shapefile.
pub fn shp_header(shape_type: i32) -> Vec<u8> {
    let mut header = vec![0u8; 100];
    header[0..4].copy_from_slice(&9994i32.to_be_bytes());
    header[24..28].copy_from_slice(&50i32.to_be_bytes());
    header[28..32].copy_from_slice(&1000i32.to_le_bytes());
    header[32..36].copy_from_slice(&shape_type.to_le_bytes());
    header
}

/// `communes.shp`: polygons in Lambert-93, one duplicated row.
pub fn write_communes(dir: &Path) -> PathBuf {
    ShapefileFixture::new("communes", SHAPE_POLYGON)
        .field(text_field("NOM", 24))
        .field(int_field("POP", 8))
        .record(&[b"Paris", b"2100000"])
        .record(&[b"Lyon", b"500000"])
        .record(&[b"Paris", b"2100000"])
        .prj(LAMBERT_93_WKT)
        .cpg("UTF-8")
        .write(dir)
}

/// `routes.shp`: polylines without CRS, names in windows-1252.
pub fn write_routes(dir: &Path) -> PathBuf {
    ShapefileFixture::new("routes", SHAPE_POLYLINE)
        .field(text_field("NOM", 32))
        .record(&[b"Ch\xe2teau"])
        .record(&[b"Rue de l'\xc9glise"])
        .write(dir)
}

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
        ('RGF93 / Lambert-93', 2154, 'EPSG', 2154, 'PROJCS[\"RGF93 / Lambert-93\"]', NULL);
";

/// `bdtopo.gpkg`: one line layer `troncons` in Lambert-93.
pub fn write_bdtopo(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join("bdtopo.gpkg");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(GPKG_CORE).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE troncons (fid INTEGER PRIMARY KEY, geom BLOB, nature TEXT(20), voies INTEGER);
        INSERT INTO troncons VALUES (1, x'00', 'Route', 2);
        INSERT INTO troncons VALUES (2, x'00', 'Chemin', 1);
        INSERT INTO troncons VALUES (3, x'00', 'Route', 2);
        INSERT INTO gpkg_contents (table_name, data_type, srs_id)
            VALUES ('troncons', 'features', 2154);
        INSERT INTO gpkg_geometry_columns VALUES ('troncons', 'geom', 'MULTILINESTRING', 2154, 0, 0);
        ",
    )
    .unwrap();
    path
}

/// A metadata inventory listing `names` in `metadonnees.nom_bdd`.
pub fn write_inventory(path: &Path, names: &[&str]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadonnees (id INTEGER PRIMARY KEY, nom_bdd TEXT, producteur TEXT);",
    )
    .unwrap();
    for name in names {
        conn.execute(
            "INSERT INTO metadonnees (nom_bdd, producteur) VALUES (?1, 'IGN')",
            [name],
        )
        .unwrap();
    }
}
