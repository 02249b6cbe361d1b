//! Recursive data file discovery.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Errors from directory scans.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The root is missing or not a directory.
    #[error("Data directory '{}' does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The walk failed partway.
    #[error("Failed to scan '{}': {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Set of file extensions, compared case-insensitively and without the dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    /// True when `path` has one of the extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.0.contains(&ext.to_ascii_lowercase()))
    }

    /// Extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A discovered file, split into the parts reports need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    /// File name with extension.
    pub file_name: String,
    /// File name without extension.
    pub stem: String,
    /// Extension with its leading dot (`.shp`), empty when there is none.
    pub extension: String,
}

impl DataFile {
    pub fn new(path: PathBuf) -> Self {
        let lossy = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let file_name = lossy(path.file_name());
        let stem = lossy(path.file_stem());
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Self {
            path,
            file_name,
            stem,
            extension,
        }
    }
}

/// Every regular file under `root` whose extension is in `extensions`,
/// sorted by path.
pub fn discover(root: &Path, extensions: &ExtensionSet) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && extensions.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(
        root = %root.display(),
        count = files.len(),
        "Discovered data files"
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_recursive_case_insensitive_sorted() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("b").join("c");
        std::fs::create_dir_all(&nested).unwrap();
        for path in [
            temp.path().join("z.SHP"),
            temp.path().join("a.gpkg"),
            temp.path().join("a.dbf"),
            nested.join("m.shp"),
            temp.path().join("noext"),
        ] {
            std::fs::write(path, b"").unwrap();
        }

        let files = discover(temp.path(), &ExtensionSet::new(["shp", ".GPKG"])).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.gpkg"),
                PathBuf::from("b/c/m.shp"),
                PathBuf::from("z.SHP"),
            ]
        );
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = discover(&temp.path().join("missing"), &ExtensionSet::new(["shp"])).unwrap_err();
        assert!(matches!(err, DiscoveryError::NotADirectory(_)));
    }

    #[test]
    fn test_data_file_parts() {
        let file = DataFile::new(PathBuf::from("/data/routes/A36.shp"));
        assert_eq!(file.file_name, "A36.shp");
        assert_eq!(file.stem, "A36");
        assert_eq!(file.extension, ".shp");
    }
}
