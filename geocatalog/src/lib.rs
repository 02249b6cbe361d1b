//! geocatalog - a catalog of geospatial datasets
//!
//! This library scans a directory of Shapefiles and GeoPackages, extracts
//! each dataset's layer name, spatial reference, geometry type, attribute
//! schema and distinct attribute values, and loads them into a SQLite
//! catalog. It can also reconcile the directory against an external
//! metadata inventory.
//!
//! # High-Level API
//!
//! ```ignore
//! use geocatalog::catalog::SqliteCatalog;
//! use geocatalog::ingest::CatalogLoader;
//!
//! let mut catalog = SqliteCatalog::open(&catalog_path)?;
//! let report = CatalogLoader::default().run(&data_dir, catalog.begin()?)?;
//! println!("{report}");
//! ```

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod encoding;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod reconcile;
pub mod schema;
pub mod source;
pub mod types;
pub mod values;

/// Version of the geocatalog library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
