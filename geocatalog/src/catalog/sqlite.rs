//! SQLite catalog store.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use super::model::{
    AttributeId, AttributeTypeId, AttributeValueId, GeoLayerId, GeometryTypeId, OgcRelation,
    PriorityLevel,
};
use super::snapshot::{self, CatalogCounts, CatalogSnapshot};
use super::{CatalogError, CatalogWriter, UnitOfWork};
use crate::geometry::GeometryKind;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS geometry_type (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS attribute_type (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS geolayer (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE,
    geom_id   INTEGER NOT NULL REFERENCES geometry_type (id) ON DELETE CASCADE,
    epsg_code INTEGER
);
CREATE TABLE IF NOT EXISTS attribute (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    geolayer_id INTEGER NOT NULL REFERENCES geolayer (id) ON DELETE CASCADE,
    type_id     INTEGER NOT NULL REFERENCES attribute_type (id) ON DELETE CASCADE,
    UNIQUE (geolayer_id, name)
);
CREATE TABLE IF NOT EXISTS attribute_priority_level (
    id   INTEGER PRIMARY KEY,
    name TEXT UNIQUE
);
CREATE TABLE IF NOT EXISTS attribute_value (
    id                INTEGER PRIMARY KEY,
    content           TEXT NOT NULL,
    geolayer_id       INTEGER NOT NULL REFERENCES geolayer (id) ON DELETE CASCADE,
    attribute_id      INTEGER NOT NULL REFERENCES attribute (id) ON DELETE CASCADE,
    priority_level_id INTEGER REFERENCES attribute_priority_level (id) ON DELETE CASCADE,
    UNIQUE (content, geolayer_id, attribute_id)
);
CREATE TABLE IF NOT EXISTS ogc_relation_type (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
";

/// Catalog stored in a SQLite database.
pub struct SqliteCatalog {
    path: Option<PathBuf>,
    conn: Connection,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteCatalog {
    /// Open (creating if needed) the catalog at `path`.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CatalogError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| CatalogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::init(Some(path.to_path_buf()), conn)?;
        info!(path = %path.display(), "Opened catalog");
        Ok(catalog)
    }

    /// Open a throwaway catalog held in memory.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(|source| CatalogError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(None, conn)
    }

    fn init(path: Option<PathBuf>, conn: Connection) -> Result<Self, CatalogError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;

        for level in PriorityLevel::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO attribute_priority_level (name) VALUES (?1)",
                [level.as_str()],
            )?;
        }
        for relation in OgcRelation::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO ogc_relation_type (name) VALUES (?1)",
                [relation.as_str()],
            )?;
        }

        Ok(Self { path, conn })
    }

    /// Database file, `None` for in-memory catalogs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a unit of work. Its writes are invisible to other connections
    /// until committed.
    pub fn begin(&mut self) -> Result<SqliteUnitOfWork<'_>, CatalogError> {
        let tx = self.conn.transaction()?;
        debug!("Catalog transaction started");
        Ok(SqliteUnitOfWork { tx })
    }

    /// Find the id of a stored value.
    pub fn find_attribute_value(
        &self,
        layer: &str,
        attribute: &str,
        content: &str,
    ) -> Result<Option<AttributeValueId>, CatalogError> {
        let id = self
            .conn
            .query_row(
                "SELECT v.id FROM attribute_value v
                 JOIN geolayer l ON l.id = v.geolayer_id
                 JOIN attribute a ON a.id = v.attribute_id
                 WHERE l.name = ?1 AND a.name = ?2 AND v.content = ?3",
                params![layer, attribute, content],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(AttributeValueId))
    }

    /// Set or clear the priority level of a value.
    pub fn set_priority_level(
        &mut self,
        value: AttributeValueId,
        level: Option<PriorityLevel>,
    ) -> Result<(), CatalogError> {
        let level_id: Option<i64> = match level {
            Some(level) => Some(self.conn.query_row(
                "SELECT id FROM attribute_priority_level WHERE name = ?1",
                [level.as_str()],
                |row| row.get(0),
            )?),
            None => None,
        };

        let updated = self.conn.execute(
            "UPDATE attribute_value SET priority_level_id = ?1 WHERE id = ?2",
            params![level_id, value.0],
        )?;
        if updated == 0 {
            return Err(CatalogError::NotFound {
                entity: "AttributeValue",
                id: value.0,
            });
        }
        Ok(())
    }

    /// Priority level of a value.
    pub fn priority_level(
        &self,
        value: AttributeValueId,
    ) -> Result<Option<PriorityLevel>, CatalogError> {
        let name: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT p.name FROM attribute_value v
                 LEFT JOIN attribute_priority_level p ON p.id = v.priority_level_id
                 WHERE v.id = ?1",
                [value.0],
                |row| row.get(0),
            )
            .optional()?;

        let name = name.ok_or(CatalogError::NotFound {
            entity: "AttributeValue",
            id: value.0,
        })?;
        name.map(|n| {
            n.parse()
                .map_err(|e: super::UnknownVocabulary| CatalogError::Rejected(e.to_string()))
        })
        .transpose()
    }

    /// Seeded OGC relation vocabulary.
    pub fn ogc_relations(&self) -> Result<Vec<OgcRelation>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM ogc_relation_type ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names.iter().filter_map(|n| n.parse().ok()).collect())
    }

    /// Every catalog row, keyed by natural keys.
    pub fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        Ok(snapshot::load(&self.conn)?)
    }

    /// Row counts per table.
    pub fn counts(&self) -> Result<CatalogCounts, CatalogError> {
        Ok(snapshot::counts(&self.conn)?)
    }
}

/// A catalog transaction. Rolls back when dropped without
/// [`commit`](UnitOfWork::commit).
pub struct SqliteUnitOfWork<'a> {
    tx: Transaction<'a>,
}

impl CatalogWriter for SqliteUnitOfWork<'_> {
    fn clear(&mut self) -> Result<(), CatalogError> {
        self.tx.execute_batch(
            "DELETE FROM attribute_value;
             DELETE FROM attribute;
             DELETE FROM geolayer;
             DELETE FROM attribute_type;
             DELETE FROM geometry_type;",
        )?;
        debug!("Catalog cleared");
        Ok(())
    }

    fn upsert_geometry_type(&mut self, kind: GeometryKind) -> Result<GeometryTypeId, CatalogError> {
        let id = self.tx.query_row(
            "INSERT INTO geometry_type (name) VALUES (?1)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name
             RETURNING id",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(GeometryTypeId(id))
    }

    fn upsert_geolayer(
        &mut self,
        name: &str,
        epsg: Option<u32>,
        geometry: GeometryTypeId,
    ) -> Result<GeoLayerId, CatalogError> {
        let id = self.tx.query_row(
            "INSERT INTO geolayer (name, geom_id, epsg_code) VALUES (?1, ?2, ?3)
             ON CONFLICT (name) DO UPDATE
                SET geom_id = excluded.geom_id, epsg_code = excluded.epsg_code
             RETURNING id",
            params![name, geometry.0, epsg],
            |row| row.get(0),
        )?;
        Ok(GeoLayerId(id))
    }

    fn upsert_attribute_type(&mut self, name: &str) -> Result<AttributeTypeId, CatalogError> {
        let id = self.tx.query_row(
            "INSERT INTO attribute_type (name) VALUES (?1)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name
             RETURNING id",
            [name],
            |row| row.get(0),
        )?;
        Ok(AttributeTypeId(id))
    }

    fn upsert_attribute(
        &mut self,
        layer: GeoLayerId,
        name: &str,
        attribute_type: AttributeTypeId,
    ) -> Result<AttributeId, CatalogError> {
        let id = self.tx.query_row(
            "INSERT INTO attribute (name, geolayer_id, type_id) VALUES (?1, ?2, ?3)
             ON CONFLICT (geolayer_id, name) DO UPDATE SET type_id = excluded.type_id
             RETURNING id",
            params![name, layer.0, attribute_type.0],
            |row| row.get(0),
        )?;
        Ok(AttributeId(id))
    }

    fn insert_attribute_value(
        &mut self,
        layer: GeoLayerId,
        attribute: AttributeId,
        content: &str,
    ) -> Result<bool, CatalogError> {
        let inserted = self.tx.execute(
            "INSERT OR IGNORE INTO attribute_value (content, geolayer_id, attribute_id)
             VALUES (?1, ?2, ?3)",
            params![content, layer.0, attribute.0],
        )?;
        Ok(inserted > 0)
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn commit(self) -> Result<(), CatalogError> {
        self.tx.commit()?;
        debug!("Catalog transaction committed");
        Ok(())
    }
}
