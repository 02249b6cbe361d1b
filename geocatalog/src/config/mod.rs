//! User configuration.
//!
//! Settings are read from `~/.geocatalog/config.ini`. A missing file yields
//! defaults; command-line flags override file values.
//!
//! # Example
//!
//! ```
//! use geocatalog::config::{ConfigFile, ConfigKey};
//!
//! let mut config = ConfigFile::default();
//! ConfigKey::IngestOnError.set(&mut config, "abort").unwrap();
//! assert_eq!(ConfigKey::IngestOnError.get(&config), "abort");
//! ```

mod defaults;
mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use defaults::DEFAULT_CATALOG_FILE;
pub use file::{config_directory, config_file_path, ConfigFileError, ConfigInit};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    CatalogSettings, ConfigFile, DataSettings, EncodingSettings, IngestSettings,
    LoggingSettings, ReconcileSettings,
};
