//! External metadata inventory (a SQLite database).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use super::ReconcileError;
use crate::source::FieldValue;

/// One inventory table, every cell stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl InventoryTable {
    /// Index of `column`, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Values of `column`, one per row.
    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let index = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }
}

/// Every table of an inventory database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub path: PathBuf,
    pub tables: BTreeMap<String, InventoryTable>,
}

impl Inventory {
    /// Load every user table of the database at `path`, read-only.
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let sqlite = |source| ReconcileError::Inventory {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(sqlite)?;

        let names: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .map_err(sqlite)?;
            let names = stmt
                .query_map([], |row| row.get(0))
                .map_err(sqlite)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(sqlite)?;
            names
        };
        info!(path = %path.display(), tables = ?names, "Detected inventory tables");

        let mut tables = BTreeMap::new();
        for name in names {
            let table = read_table(&conn, &name).map_err(sqlite)?;
            debug!(table = %name, rows = table.rows.len(), "Loaded inventory table");
            tables.insert(name, table);
        }

        Ok(Self {
            path: path.to_path_buf(),
            tables,
        })
    }

    /// The table named `name`.
    pub fn table(&self, name: &str) -> Result<&InventoryTable, ReconcileError> {
        self.tables
            .get(name)
            .ok_or_else(|| ReconcileError::InventoryTableMissing {
                path: self.path.clone(),
                table: name.to_string(),
                available: self.tables.keys().cloned().collect(),
            })
    }
}

fn read_table(conn: &Connection, name: &str) -> Result<InventoryTable, rusqlite::Error> {
    let sql = format!("SELECT * FROM \"{}\"", name.replace('"', "\"\""));
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(cell_text(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    Ok(InventoryTable { columns, rows })
}

fn cell_text(value: ValueRef<'_>) -> String {
    let value = match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(v) => FieldValue::Integer(v),
        ValueRef::Real(v) => FieldValue::Real(v),
        ValueRef::Text(bytes) => FieldValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => FieldValue::Bytes(bytes.to_vec()),
    };
    value.to_string()
}
