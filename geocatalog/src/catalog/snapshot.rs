//! Read-side views of the catalog.

use std::collections::BTreeSet;

use rusqlite::Connection;

/// Every catalog row, identified by natural keys instead of row ids, so two
/// snapshots compare equal when they hold the same data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub geometry_types: BTreeSet<String>,
    pub attribute_types: BTreeSet<String>,
    /// `(name, epsg, geometry type)`
    pub geolayers: BTreeSet<(String, Option<u32>, String)>,
    /// `(layer, attribute, storage type)`
    pub attributes: BTreeSet<(String, String, String)>,
    /// `(layer, attribute, content)`
    pub attribute_values: BTreeSet<(String, String, String)>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub geometry_types: usize,
    pub attribute_types: usize,
    pub geolayers: usize,
    pub attributes: usize,
    pub attribute_values: usize,
    pub priority_levels: usize,
    pub ogc_relations: usize,
}

pub(super) fn load(conn: &Connection) -> Result<CatalogSnapshot, rusqlite::Error> {
    let names = |sql: &str| -> Result<BTreeSet<String>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    };
    let triples = |sql: &str| -> Result<BTreeSet<(String, String, String)>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect()
    };

    let mut stmt = conn.prepare(
        "SELECT l.name, l.epsg_code, g.name FROM geolayer l
         JOIN geometry_type g ON g.id = l.geom_id",
    )?;
    let geolayers = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(CatalogSnapshot {
        geometry_types: names("SELECT name FROM geometry_type")?,
        attribute_types: names("SELECT name FROM attribute_type")?,
        geolayers,
        attributes: triples(
            "SELECT l.name, a.name, t.name FROM attribute a
             JOIN geolayer l ON l.id = a.geolayer_id
             JOIN attribute_type t ON t.id = a.type_id",
        )?,
        attribute_values: triples(
            "SELECT l.name, a.name, v.content FROM attribute_value v
             JOIN geolayer l ON l.id = v.geolayer_id
             JOIN attribute a ON a.id = v.attribute_id",
        )?,
    })
}

pub(super) fn counts(conn: &Connection) -> Result<CatalogCounts, rusqlite::Error> {
    let count = |table: &str| -> Result<usize, rusqlite::Error> {
        let n: i64 = conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    };

    Ok(CatalogCounts {
        geometry_types: count("geometry_type")?,
        attribute_types: count("attribute_type")?,
        geolayers: count("geolayer")?,
        attributes: count("attribute")?,
        attribute_values: count("attribute_value")?,
        priority_levels: count("attribute_priority_level")?,
        ogc_relations: count("ogc_relation_type")?,
    })
}
