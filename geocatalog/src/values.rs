//! Distinct attribute values.
//!
//! Loads a layer's attribute table through the [`EncodingResolver`] and
//! collects, for every attribute column, the distinct values it takes.
//! Values are stringified (see [`FieldValue`]'s `Display`) and kept in the
//! order they are first seen.

use std::collections::{HashMap, HashSet};

use crate::encoding::{EncodingResolver, ResolveError, TextEncoding};
use crate::source::{FieldValue, GeoSource, Table};

/// Rename duplicate column names.
///
/// The first occurrence of a name is kept. The Nth duplicate (N >= 1) becomes
/// `<name>_N`, with trailing underscores stripped from `<name>` first. A
/// generated name never reuses a name already present in the input or
/// already generated: the suffix keeps counting until it is free.
///
/// ```
/// use geocatalog::values::unique_column_names;
///
/// let names = ["A", "A", "B_", "B_"].map(String::from);
/// assert_eq!(unique_column_names(&names), ["A", "A_1", "B_", "B_1"]);
///
/// let names = ["A", "A_1", "A"].map(String::from);
/// assert_eq!(unique_column_names(&names), ["A", "A_1", "A_2"]);
/// ```
pub fn unique_column_names(names: &[String]) -> Vec<String> {
    let original: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut counts: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|name| {
            if taken.insert(name.clone()) {
                return name.clone();
            }
            let base = name.trim_end_matches('_');
            let count = counts.entry(name.as_str()).or_insert(0);
            loop {
                *count += 1;
                let candidate = format!("{}_{}", base, count);
                // Later columns keep their own names, so skip those too.
                if !original.contains(candidate.as_str()) && taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Deduplicated attribute column names, geometry column excluded.
pub fn attribute_columns(names: &[String], geometry_column: Option<&str>) -> Vec<String> {
    let attributes: Vec<String> = names
        .iter()
        .filter(|name| Some(name.as_str()) != geometry_column)
        .cloned()
        .collect();
    unique_column_names(&attributes)
}

/// Distinct values of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctValues {
    /// Attribute name, after deduplication.
    pub attribute: String,
    /// Distinct stringified values in first-seen order.
    pub values: Vec<String>,
}

/// Distinct values of every attribute of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCatalog {
    /// Encoding the table was decoded with.
    pub encoding: TextEncoding,
    /// Number of rows read.
    pub row_count: usize,
    /// One entry per attribute column, in column order.
    pub attributes: Vec<DistinctValues>,
}

impl ValueCatalog {
    /// Compute distinct values from an already decoded table.
    pub fn from_table(table: &Table, encoding: TextEncoding) -> Self {
        let keep: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| Some(name.as_str()) != table.geometry_column.as_deref())
            .map(|(i, _)| i)
            .collect();
        let names = attribute_columns(&table.columns, table.geometry_column.as_deref());

        let mut attributes: Vec<DistinctValues> = names
            .into_iter()
            .map(|attribute| DistinctValues {
                attribute,
                values: Vec::new(),
            })
            .collect();
        let mut seen: Vec<HashSet<String>> = vec![HashSet::new(); attributes.len()];

        for row in &table.rows {
            for (slot, &column) in keep.iter().enumerate() {
                let text = row
                    .get(column)
                    .unwrap_or(&FieldValue::Null)
                    .to_string();
                if seen[slot].insert(text.clone()) {
                    attributes[slot].values.push(text);
                }
            }
        }

        Self {
            encoding,
            row_count: table.len(),
            attributes,
        }
    }

    /// Distinct values of `attribute`, if it exists.
    pub fn get(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|a| a.attribute == attribute)
            .map(|a| a.values.as_slice())
    }

    /// Total number of distinct values across attributes.
    pub fn value_count(&self) -> usize {
        self.attributes.iter().map(|a| a.values.len()).sum()
    }
}

/// Read `layer` from `source` and compute its distinct values.
pub fn extract_values(
    resolver: &EncodingResolver,
    source: &dyn GeoSource,
    layer: &str,
) -> Result<ValueCatalog, ResolveError> {
    let resolved = resolver.read_table(source, layer)?;
    Ok(ValueCatalog::from_table(&resolved.value, resolved.encoding))
}
