//! Catalog data model and persistence.
//!
//! The catalog records, for every ingested layer, its geometry type, its
//! CRS, its attributes with their storage types, and the distinct values
//! each attribute takes.
//!
//! Writes go through the [`CatalogWriter`] trait. A full ingestion run holds
//! a [`UnitOfWork`]: a writer that applies nothing until [`UnitOfWork::commit`]
//! and discards everything when dropped uncommitted. [`SqliteCatalog`] is the
//! embedded implementation.
//!
//! # Example
//!
//! ```ignore
//! use geocatalog::catalog::{CatalogWriter, SqliteCatalog, UnitOfWork};
//! use geocatalog::geometry::GeometryKind;
//!
//! let mut catalog = SqliteCatalog::open("catalog.sqlite".as_ref())?;
//! let mut uow = catalog.begin()?;
//! let geom = uow.upsert_geometry_type(GeometryKind::Point)?;
//! uow.upsert_geolayer("arrets", Some(2154), geom)?;
//! uow.commit()?;
//! ```

mod model;
mod snapshot;
mod sqlite;

pub use model::{
    AttributeId, AttributeTypeId, AttributeValueId, GeoLayerId, GeometryTypeId, OgcRelation,
    PriorityLevel, UnknownVocabulary,
};
pub use snapshot::{CatalogCounts, CatalogSnapshot};
pub use sqlite::{SqliteCatalog, SqliteUnitOfWork};

use std::path::PathBuf;

use crate::geometry::GeometryKind;

/// Errors raised by catalog stores. Fatal for an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The store could not be created or opened.
    #[error("Failed to open catalog '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The catalog directory could not be created.
    #[error("Failed to create catalog directory '{}': {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A statement failed.
    #[error("Catalog query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A referenced row does not exist.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: i64 },

    /// A write was rejected by the store.
    #[error("Catalog write rejected: {0}")]
    Rejected(String),
}

/// Write access to the catalog.
///
/// Upserts return the id of the inserted or updated row.
pub trait CatalogWriter {
    /// Delete every layer, attribute, attribute type and geometry type, with
    /// their values. Reference vocabularies are kept.
    fn clear(&mut self) -> Result<(), CatalogError>;

    /// Insert the geometry type if missing.
    fn upsert_geometry_type(&mut self, kind: GeometryKind) -> Result<GeometryTypeId, CatalogError>;

    /// Insert the layer, or update its EPSG code and geometry type.
    fn upsert_geolayer(
        &mut self,
        name: &str,
        epsg: Option<u32>,
        geometry: GeometryTypeId,
    ) -> Result<GeoLayerId, CatalogError>;

    /// Insert the storage type if missing.
    fn upsert_attribute_type(&mut self, name: &str) -> Result<AttributeTypeId, CatalogError>;

    /// Insert the attribute of `layer`, or update its type.
    fn upsert_attribute(
        &mut self,
        layer: GeoLayerId,
        name: &str,
        attribute_type: AttributeTypeId,
    ) -> Result<AttributeId, CatalogError>;

    /// Record one distinct value. Returns `false` when the
    /// `(content, layer, attribute)` triple was already present.
    fn insert_attribute_value(
        &mut self,
        layer: GeoLayerId,
        attribute: AttributeId,
        content: &str,
    ) -> Result<bool, CatalogError>;
}

/// A batch of catalog writes applied atomically.
///
/// Dropping a unit of work without calling [`commit`](UnitOfWork::commit)
/// discards its writes.
pub trait UnitOfWork: CatalogWriter {
    /// Make every write of this unit durable.
    fn commit(self) -> Result<(), CatalogError>;
}
