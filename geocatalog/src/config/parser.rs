//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::encoding::parse_encoding_list;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [data] section
    if let Some(section) = ini.section(Some("data")) {
        if let Some(v) = section.get("directory") {
            config.data.directory = optional_path(v);
        }
        if let Some(v) = section.get("extensions") {
            let extensions = parse_extension_list(v);
            if extensions.is_empty() {
                return Err(invalid(
                    "data",
                    "extensions",
                    v,
                    "expected a comma-separated list like 'shp, gpkg'",
                ));
            }
            config.data.extensions = extensions;
        }
    }

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = non_empty(section, "path") {
            config.catalog.path = expand_tilde(v);
        }
    }

    // [encoding] section
    if let Some(section) = ini.section(Some("encoding")) {
        if let Some(v) = section.get("candidates") {
            let candidates = parse_encoding_list(v).map_err(|label| {
                invalid(
                    "encoding",
                    "candidates",
                    v,
                    &format!("unknown encoding '{}'", label),
                )
            })?;
            if candidates.is_empty() {
                return Err(invalid(
                    "encoding",
                    "candidates",
                    v,
                    "at least one encoding is required",
                ));
            }
            config.encoding.candidates = candidates;
        }
        if let Some(v) = section.get("min_confidence") {
            config.encoding.min_confidence = parse_confidence(v).ok_or_else(|| {
                invalid(
                    "encoding",
                    "min_confidence",
                    v,
                    "expected a number between 0 and 1",
                )
            })?;
        }
        if let Some(v) = section.get("sample_bytes") {
            config.encoding.sample_bytes = parse_value(v, "encoding", "sample_bytes")?;
            if config.encoding.sample_bytes == 0 {
                return Err(invalid(
                    "encoding",
                    "sample_bytes",
                    v,
                    "must be greater than zero",
                ));
            }
        }
    }

    // [ingest] section
    if let Some(section) = ini.section(Some("ingest")) {
        if let Some(v) = section.get("on_error") {
            config.ingest.on_error = parse_value(v, "ingest", "on_error")?;
        }
    }

    // [reconcile] section
    if let Some(section) = ini.section(Some("reconcile")) {
        if let Some(v) = non_empty(section, "inventory_extension") {
            config.reconcile.inventory_extension = v.trim_start_matches('.').to_string();
        }
        if let Some(v) = non_empty(section, "table") {
            config.reconcile.table = v.to_string();
        }
        if let Some(v) = non_empty(section, "name_column") {
            config.reconcile.name_column = v.to_string();
        }
        if let Some(v) = section.get("match_on") {
            config.reconcile.match_on = parse_value(v, "reconcile", "match_on")?;
        }
        if let Some(v) = section.get("report_dir") {
            config.reconcile.report_dir = optional_path(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse with `FromStr`, reporting the parser's message as the reason.
fn parse_value<T>(value: &str, section: &str, key: &str) -> Result<T, ConfigFileError>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, &e.to_string()))
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// A confidence threshold in `[0, 1]`.
pub(super) fn parse_confidence(value: &str) -> Option<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
}

/// Split `shp, .GPKG` into `["shp", "gpkg"]`.
pub(super) fn parse_extension_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Empty means unset.
pub(super) fn optional_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(expand_tilde(value))
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
