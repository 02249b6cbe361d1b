//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (get, set, list, path, init)
//! - [`ingest`] - Full catalog ingestion of a data directory
//! - [`inspect`] - Schema, CRS, types and encoding of one file
//! - [`reconcile`] - Data directory vs. metadata inventory

pub mod config;
pub mod ingest;
pub mod inspect;
pub mod reconcile;
