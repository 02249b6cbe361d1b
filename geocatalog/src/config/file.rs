//! Loading and saving `~/.geocatalog/config.ini`.
//!
//! A missing file is not an error: every setting has a default, and the
//! catalog and log file both live next to the config file unless moved.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

pub use super::settings::*;

/// Directory under the home directory holding config, catalog and log.
const CONFIG_DIR_NAME: &str = ".geocatalog";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but is not valid INI.
    #[error("Cannot read configuration '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// The file could not be written.
    #[error("Cannot write configuration '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A setting holds a value geocatalog cannot use.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// What [`ConfigFile::ensure_exists_at`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigInit {
    /// A default file was written.
    Created(PathBuf),
    /// A file was already there and was left untouched.
    Existing(PathBuf),
}

impl ConfigInit {
    pub fn path(&self) -> &Path {
        match self {
            ConfigInit::Created(path) | ConfigInit::Existing(path) => path,
        }
    }
}

impl ConfigFile {
    /// Load `~/.geocatalog/config.ini`, or defaults when it is absent.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load the file at `path`, or defaults when it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = super::parser::parse_ini(&ini)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save to `~/.geocatalog/config.ini`.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, super::writer::to_config_string(self)).map_err(write_error)
    }

    /// Write a default `~/.geocatalog/config.ini` unless one exists.
    pub fn ensure_exists() -> Result<ConfigInit, ConfigFileError> {
        Self::ensure_exists_at(&config_file_path())
    }

    /// Write a default config file at `path` unless one exists.
    pub fn ensure_exists_at(path: &Path) -> Result<ConfigInit, ConfigFileError> {
        if path.exists() {
            return Ok(ConfigInit::Existing(path.to_path_buf()));
        }
        Self::default().save_to(path)?;
        Ok(ConfigInit::Created(path.to_path_buf()))
    }
}

/// `~/.geocatalog`, or `./.geocatalog` when there is no home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// `~/.geocatalog/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::ingest::FailurePolicy;
    use crate::reconcile::MatchKey;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert!(config.data.directory.is_none());
        assert_eq!(config.data.extensions, vec!["shp", "gpkg"]);
        assert!(config.catalog.path.ends_with(".geocatalog/catalog.sqlite"));
        assert_eq!(
            config.encoding.candidates,
            vec![
                TextEncoding::Utf8,
                TextEncoding::Windows1252,
                TextEncoding::Latin1
            ]
        );
        assert_eq!(config.ingest.on_error, FailurePolicy::Skip);
        assert_eq!(config.reconcile.table, "metadonnees");
        assert_eq!(config.reconcile.name_column, "nom_bdd");
        assert_eq!(config.reconcile.match_on, MatchKey::FileName);
        assert!(config.logging.file.ends_with("geocatalog.log"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("nonexistent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_unreadable_file_names_its_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[data\ndirectory = /srv").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Read { .. }));
        assert!(err.to_string().contains("config.ini"));
    }

    #[test]
    fn test_ensure_exists_creates_then_keeps() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".geocatalog").join("config.ini");

        let first = ConfigFile::ensure_exists_at(&path).unwrap();
        assert_eq!(first, ConfigInit::Created(path.clone()));
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());

        std::fs::write(&path, "[ingest]\non_error = abort\n").unwrap();
        let second = ConfigFile::ensure_exists_at(&path).unwrap();
        assert_eq!(second, ConfigInit::Existing(path.clone()));
        assert_eq!(
            ConfigFile::load_from(&path).unwrap().ingest.on_error,
            FailurePolicy::Abort
        );
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = ConfigFile::default()
            .save_to(&blocker.join("config.ini"))
            .unwrap_err();
        assert!(matches!(err, ConfigFileError::Write { .. }));
    }
}
