//! Configuration key access and validation.
//!
//! Type-safe get/set of configuration values by `section.key` name, with
//! validation through small value specifications.

use std::str::FromStr;
use thiserror::Error;

use super::file::ConfigFile;
use super::parser::{expand_tilde, optional_path, parse_confidence, parse_extension_list};
use super::writer::path_to_string;
use crate::encoding::parse_encoding_list;
use crate::ingest::FailurePolicy;
use crate::reconcile::MatchKey;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a specific field in [`ConfigFile`] and knows how to
/// get and set its value with proper validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DataDirectory,
    DataExtensions,
    CatalogPath,
    EncodingCandidates,
    EncodingMinConfidence,
    EncodingSampleBytes,
    IngestOnError,
    ReconcileInventoryExtension,
    ReconcileTable,
    ReconcileNameColumn,
    ReconcileMatchOn,
    ReconcileReportDir,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == lower)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the canonical key name (e.g., "reconcile.table").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::DataDirectory => "data.directory",
            ConfigKey::DataExtensions => "data.extensions",
            ConfigKey::CatalogPath => "catalog.path",
            ConfigKey::EncodingCandidates => "encoding.candidates",
            ConfigKey::EncodingMinConfidence => "encoding.min_confidence",
            ConfigKey::EncodingSampleBytes => "encoding.sample_bytes",
            ConfigKey::IngestOnError => "ingest.on_error",
            ConfigKey::ReconcileInventoryExtension => "reconcile.inventory_extension",
            ConfigKey::ReconcileTable => "reconcile.table",
            ConfigKey::ReconcileNameColumn => "reconcile.name_column",
            ConfigKey::ReconcileMatchOn => "reconcile.match_on",
            ConfigKey::ReconcileReportDir => "reconcile.report_dir",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Get the section name (e.g., "reconcile").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "table").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::DataDirectory => config
                .data
                .directory
                .as_deref()
                .map(path_to_string)
                .unwrap_or_default(),
            ConfigKey::DataExtensions => config.data.extensions.join(", "),
            ConfigKey::CatalogPath => path_to_string(&config.catalog.path),
            ConfigKey::EncodingCandidates => config
                .encoding
                .candidates
                .iter()
                .map(|e| e.label())
                .collect::<Vec<_>>()
                .join(", "),
            ConfigKey::EncodingMinConfidence => config.encoding.min_confidence.to_string(),
            ConfigKey::EncodingSampleBytes => config.encoding.sample_bytes.to_string(),
            ConfigKey::IngestOnError => config.ingest.on_error.to_string(),
            ConfigKey::ReconcileInventoryExtension => config.reconcile.inventory_extension.clone(),
            ConfigKey::ReconcileTable => config.reconcile.table.clone(),
            ConfigKey::ReconcileNameColumn => config.reconcile.name_column.clone(),
            ConfigKey::ReconcileMatchOn => config.reconcile.match_on.to_string(),
            ConfigKey::ReconcileReportDir => config
                .reconcile
                .report_dir
                .as_deref()
                .map(path_to_string)
                .unwrap_or_default(),
            ConfigKey::LoggingFile => path_to_string(&config.logging.file),
        }
    }

    /// Set the value in a config file.
    ///
    /// Validates the value according to the key's specification before setting.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        let invalid = |reason: String| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason,
        };
        self.validate(value)?;

        match self {
            ConfigKey::DataDirectory => config.data.directory = optional_path(value),
            ConfigKey::DataExtensions => config.data.extensions = parse_extension_list(value),
            ConfigKey::CatalogPath => config.catalog.path = expand_tilde(value),
            ConfigKey::EncodingCandidates => {
                config.encoding.candidates = parse_encoding_list(value)
                    .map_err(|label| invalid(format!("unknown encoding '{}'", label)))?;
            }
            ConfigKey::EncodingMinConfidence => {
                config.encoding.min_confidence = parse_confidence(value)
                    .ok_or_else(|| invalid("must be a number between 0 and 1".to_string()))?;
            }
            ConfigKey::EncodingSampleBytes => {
                config.encoding.sample_bytes = value.parse().map_err(|_| {
                    invalid("must be a positive integer".to_string())
                })?;
            }
            ConfigKey::IngestOnError => {
                config.ingest.on_error = value.parse::<FailurePolicy>().map_err(invalid)?;
            }
            ConfigKey::ReconcileInventoryExtension => {
                config.reconcile.inventory_extension = value.trim_start_matches('.').to_string();
            }
            ConfigKey::ReconcileTable => config.reconcile.table = value.to_string(),
            ConfigKey::ReconcileNameColumn => config.reconcile.name_column = value.to_string(),
            ConfigKey::ReconcileMatchOn => {
                config.reconcile.match_on = value.parse::<MatchKey>().map_err(invalid)?;
            }
            ConfigKey::ReconcileReportDir => config.reconcile.report_dir = optional_path(value),
            ConfigKey::LoggingFile => config.logging.file = expand_tilde(value),
        }
        Ok(())
    }

    /// Validate a value according to this key's specification.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.specification()
            .is_satisfied_by(value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    /// Get the validation specification for this key.
    fn specification(&self) -> Box<dyn ValueSpecification> {
        match self {
            ConfigKey::DataDirectory => Box::new(OptionalPathSpec),
            ConfigKey::DataExtensions => Box::new(ExtensionListSpec),
            ConfigKey::CatalogPath => Box::new(PathSpec),
            ConfigKey::EncodingCandidates => Box::new(EncodingListSpec),
            ConfigKey::EncodingMinConfidence => Box::new(ConfidenceSpec),
            ConfigKey::EncodingSampleBytes => Box::new(PositiveIntegerSpec),
            ConfigKey::IngestOnError => Box::new(OneOfSpec::new(&["skip", "abort"])),
            ConfigKey::ReconcileInventoryExtension => Box::new(NonEmptySpec),
            ConfigKey::ReconcileTable => Box::new(NonEmptySpec),
            ConfigKey::ReconcileNameColumn => Box::new(NonEmptySpec),
            ConfigKey::ReconcileMatchOn => Box::new(OneOfSpec::new(&["filename", "stem"])),
            ConfigKey::ReconcileReportDir => Box::new(OptionalPathSpec),
            ConfigKey::LoggingFile => Box::new(PathSpec),
        }
    }

    /// Get all supported configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::DataDirectory,
            ConfigKey::DataExtensions,
            ConfigKey::CatalogPath,
            ConfigKey::EncodingCandidates,
            ConfigKey::EncodingMinConfidence,
            ConfigKey::EncodingSampleBytes,
            ConfigKey::IngestOnError,
            ConfigKey::ReconcileInventoryExtension,
            ConfigKey::ReconcileTable,
            ConfigKey::ReconcileNameColumn,
            ConfigKey::ReconcileMatchOn,
            ConfigKey::ReconcileReportDir,
            ConfigKey::LoggingFile,
        ]
    }
}

// ============================================================================
// Value Specifications
// ============================================================================

/// Trait for value validation specifications.
trait ValueSpecification {
    /// Returns Ok(()) if valid, Err(reason) if invalid.
    fn is_satisfied_by(&self, value: &str) -> Result<(), String>;
}

/// Specification that requires the value to be one of a set of options.
struct OneOfSpec {
    options: &'static [&'static str],
}

impl OneOfSpec {
    fn new(options: &'static [&'static str]) -> Self {
        Self { options }
    }
}

impl ValueSpecification for OneOfSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let lower = value.to_lowercase();
        if self.options.iter().any(|opt| *opt == lower) {
            Ok(())
        } else {
            Err(format!("must be one of: {}", self.options.join(", ")))
        }
    }
}

/// Specification for positive integer values.
struct PositiveIntegerSpec;

impl ValueSpecification for PositiveIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err("must be a positive integer".to_string()),
        }
    }
}

/// Specification for a confidence threshold.
struct ConfidenceSpec;

impl ValueSpecification for ConfidenceSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        parse_confidence(value)
            .map(|_| ())
            .ok_or_else(|| "must be a number between 0 and 1".to_string())
    }
}

/// Specification for a comma-separated list of encoding labels.
struct EncodingListSpec;

impl ValueSpecification for EncodingListSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match parse_encoding_list(value) {
            Ok(list) if !list.is_empty() => Ok(()),
            Ok(_) => Err("at least one encoding is required".to_string()),
            Err(label) => Err(format!("unknown encoding '{}'", label)),
        }
    }
}

/// Specification for a comma-separated list of file extensions.
struct ExtensionListSpec;

impl ValueSpecification for ExtensionListSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if parse_extension_list(value).is_empty() {
            Err("must list at least one extension, e.g. 'shp, gpkg'".to_string())
        } else {
            Ok(())
        }
    }
}

/// Specification for non-empty values.
struct NonEmptySpec;

impl ValueSpecification for NonEmptySpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must not be empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Specification for path values (non-empty).
struct PathSpec;

impl ValueSpecification for PathSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must be a valid path".to_string())
        } else {
            Ok(())
        }
    }
}

/// Specification for optional path values (empty allowed).
struct OptionalPathSpec;

impl ValueSpecification for OptionalPathSpec {
    fn is_satisfied_by(&self, _value: &str) -> Result<(), String> {
        Ok(())
    }
}
