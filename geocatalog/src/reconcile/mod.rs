//! Reconciliation of the data directory against a metadata inventory.
//!
//! The inventory is a SQLite database found in the data directory. One of its
//! tables lists the datasets that should exist, by name. Reconciliation
//! reports which files on disk the inventory does not know about, and which
//! inventory entries have no file on disk. It never writes to the inventory
//! or to the catalog.

mod export;
mod inventory;

pub use export::{FILES_REPORT, METADATA_REPORT};
pub use inventory::{Inventory, InventoryTable};

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::discovery::{self, DataFile, DiscoveryError, ExtensionSet};
use crate::ingest::DEFAULT_EXTENSIONS;

/// Default inventory database extension.
pub const DEFAULT_INVENTORY_EXTENSION: &str = "db";
/// Default inventory table.
pub const DEFAULT_TABLE: &str = "metadonnees";
/// Default column holding dataset names.
pub const DEFAULT_NAME_COLUMN: &str = "nom_bdd";

/// Errors from reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// No inventory database under the data directory.
    #[error("No metadata inventory (*.{extension}) found under '{}'", .directory.display())]
    MetadataStoreMissing {
        directory: PathBuf,
        extension: String,
    },

    /// The inventory lacks the expected table.
    #[error(
        "Inventory '{}' has no table '{table}' (available: {})",
        .path.display(),
        .available.join(", ")
    )]
    InventoryTableMissing {
        path: PathBuf,
        table: String,
        available: Vec<String>,
    },

    /// The inventory table lacks the name column.
    #[error("Inventory table '{table}' has no column '{column}'")]
    InventoryColumnMissing { table: String, column: String },

    /// The inventory could not be read.
    #[error("Failed to read inventory '{}': {source}", .path.display())]
    Inventory {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A report could not be written.
    #[error("Failed to write report '{}': {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Which part of a file name is compared with inventory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchKey {
    /// File name with its extension (`communes.shp`).
    #[default]
    FileName,
    /// File name without extension (`communes`).
    Stem,
}

impl MatchKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKey::FileName => "filename",
            MatchKey::Stem => "stem",
        }
    }

    /// The key of `file`.
    pub fn key<'a>(&self, file: &'a DataFile) -> &'a str {
        match self {
            MatchKey::FileName => &file.file_name,
            MatchKey::Stem => &file.stem,
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filename" | "file_name" | "name" => Ok(MatchKey::FileName),
            "stem" => Ok(MatchKey::Stem),
            other => Err(format!("expected 'filename' or 'stem', got '{}'", other)),
        }
    }
}

/// Set differences between disk names and inventory names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameComparison {
    /// On disk, absent from the inventory.
    pub not_in_inventory: BTreeSet<String>,
    /// In the inventory, absent from disk.
    pub not_on_disk: BTreeSet<String>,
}

/// Compare two name sets.
///
/// ```
/// use std::collections::BTreeSet;
/// use geocatalog::reconcile::compare_names;
///
/// let disk = BTreeSet::from(["A", "B", "C"].map(String::from));
/// let inventory = BTreeSet::from(["B", "C", "D"].map(String::from));
/// let result = compare_names(&disk, &inventory);
/// assert_eq!(result.not_in_inventory, BTreeSet::from(["A".to_string()]));
/// assert_eq!(result.not_on_disk, BTreeSet::from(["D".to_string()]));
/// ```
pub fn compare_names(disk: &BTreeSet<String>, inventory: &BTreeSet<String>) -> NameComparison {
    NameComparison {
        not_in_inventory: disk.difference(inventory).cloned().collect(),
        not_on_disk: inventory.difference(disk).cloned().collect(),
    }
}

/// A disk file annotated with its inventory presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub file: DataFile,
    pub in_metadata: bool,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub inventory_path: PathBuf,
    pub table: String,
    pub name_column: String,
    pub match_key: MatchKey,
    /// Disk files, in path order.
    pub files: Vec<FileRow>,
    /// The inventory table, every row kept.
    pub inventory: InventoryTable,
    /// Presence flag of each inventory row, parallel to `inventory.rows`.
    pub on_disk: Vec<bool>,
    pub comparison: NameComparison,
}

/// Reconciles a data directory against its inventory.
#[derive(Debug, Clone)]
pub struct Reconciler {
    data_extensions: ExtensionSet,
    inventory_extension: String,
    table: String,
    name_column: String,
    match_key: MatchKey,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            data_extensions: ExtensionSet::new(DEFAULT_EXTENSIONS),
            inventory_extension: DEFAULT_INVENTORY_EXTENSION.to_string(),
            table: DEFAULT_TABLE.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            match_key: MatchKey::default(),
        }
    }
}

impl Reconciler {
    pub fn with_data_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.data_extensions = extensions;
        self
    }

    pub fn with_inventory_extension(mut self, extension: impl Into<String>) -> Self {
        self.inventory_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = column.into();
        self
    }

    pub fn with_match_key(mut self, match_key: MatchKey) -> Self {
        self.match_key = match_key;
        self
    }

    /// First inventory database under `root`, in path order.
    pub fn locate_inventory(&self, root: &Path) -> Result<PathBuf, ReconcileError> {
        let candidates = discovery::discover(
            root,
            &ExtensionSet::new([self.inventory_extension.as_str()]),
        )?;
        if candidates.len() > 1 {
            warn!(
                count = candidates.len(),
                using = %candidates[0].display(),
                "Several inventory databases found, using the first"
            );
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| ReconcileError::MetadataStoreMissing {
                directory: root.to_path_buf(),
                extension: self.inventory_extension.clone(),
            })
    }

    /// Compare the data files under `root` with the inventory found there.
    pub fn run(&self, root: &Path) -> Result<Reconciliation, ReconcileError> {
        let inventory_path = self.locate_inventory(root)?;
        let inventory = Inventory::load(&inventory_path)?;
        let table = inventory.table(&self.table)?.clone();
        let names = table
            .column_values(&self.name_column)
            .ok_or_else(|| ReconcileError::InventoryColumnMissing {
                table: self.table.clone(),
                column: self.name_column.clone(),
            })?;

        let inventory_names: BTreeSet<String> = names
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string())
            .collect();

        let files: Vec<DataFile> = discovery::discover(root, &self.data_extensions)?
            .into_iter()
            .map(DataFile::new)
            .collect();
        let disk_names: BTreeSet<String> = files
            .iter()
            .map(|f| self.match_key.key(f).to_string())
            .collect();

        let comparison = compare_names(&disk_names, &inventory_names);
        let on_disk = names.iter().map(|name| disk_names.contains(*name)).collect();
        let files = files
            .into_iter()
            .map(|file| {
                let in_metadata = inventory_names.contains(self.match_key.key(&file));
                FileRow { file, in_metadata }
            })
            .collect();

        info!(
            inventory = %inventory_path.display(),
            not_in_inventory = comparison.not_in_inventory.len(),
            not_on_disk = comparison.not_on_disk.len(),
            "Reconciliation complete"
        );

        Ok(Reconciliation {
            inventory_path,
            table: self.table.clone(),
            name_column: self.name_column.clone(),
            match_key: self.match_key,
            files,
            inventory: table,
            on_disk,
            comparison,
        })
    }
}
