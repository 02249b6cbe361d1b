//! Text encodings for attribute tables.
//!
//! Legacy formats (dBASE in particular) store text in whatever code page the
//! producing tool used, usually without saying which. This module provides:
//!
//! - [`TextEncoding`]: the encodings the pipeline knows how to decode strictly
//! - [`EncodingResolver`]: tries candidate encodings until a full parse succeeds,
//!   falling back to a statistical sniffer
//! - [`EncodingSniffer`]: the detector abstraction, with [`ChardetSniffer`] as
//!   the production implementation
//!
//! # Example
//!
//! ```
//! use geocatalog::encoding::TextEncoding;
//!
//! let latin1 = TextEncoding::from_label("ISO-8859-1").unwrap();
//! assert_eq!(latin1.decode(b"caf\xe9").unwrap(), "café");
//! assert!(TextEncoding::Utf8.decode(b"caf\xe9").is_err());
//! ```

mod resolver;
mod sniffer;

use std::fmt;
use std::path::PathBuf;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

pub use resolver::{
    EncodingResolver, Resolved, ResolveError, DEFAULT_MIN_CONFIDENCE, DEFAULT_SAMPLE_BYTES,
};
pub use sniffer::{ChardetSniffer, EncodingGuess, EncodingSniffer};

/// Bytes that windows-1252 leaves undefined.
const WINDOWS_1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// A text encoding that can decode bytes strictly.
///
/// Latin-1 is modeled separately because the WHATWG label table used by
/// `encoding_rs` folds `iso-8859-1` into windows-1252, which would make the
/// two indistinguishable in the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, malformed sequences rejected.
    Utf8,
    /// Windows-1252, undefined bytes rejected.
    Windows1252,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
    /// Any other encoding known to `encoding_rs`.
    Other(&'static Encoding),
}

impl TextEncoding {
    /// Resolve an encoding label (`utf-8`, `cp1252`, `ISO-8859-1`, `UTF8`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => {
                return Some(TextEncoding::Latin1)
            }
            "utf8" => return Some(TextEncoding::Utf8),
            "cp1252" | "1252" => return Some(TextEncoding::Windows1252),
            _ => {}
        }
        Encoding::for_label(normalized.as_bytes()).map(Self::from_encoding)
    }

    /// Map an `encoding_rs` encoding onto the strict variants.
    pub fn from_encoding(encoding: &'static Encoding) -> Self {
        if encoding == UTF_8 {
            TextEncoding::Utf8
        } else if encoding == WINDOWS_1252 {
            TextEncoding::Windows1252
        } else {
            TextEncoding::Other(encoding)
        }
    }

    /// Canonical label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "iso-8859-1",
            TextEncoding::Other(encoding) => encoding.name(),
        }
    }

    /// Decode `bytes`, failing on the first byte sequence that is not valid in
    /// this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, InvalidText> {
        let decoded = match self {
            TextEncoding::Utf8 => UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            TextEncoding::Windows1252 => {
                if bytes.iter().any(|b| WINDOWS_1252_UNDEFINED.contains(b)) {
                    None
                } else {
                    WINDOWS_1252
                        .decode_without_bom_handling_and_without_replacement(bytes)
                        .map(|text| text.into_owned())
                }
            }
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            TextEncoding::Other(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        };

        decoded.ok_or(InvalidText { encoding: *self })
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bytes that are not valid text in the requested encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid {encoding} byte sequence")]
pub struct InvalidText {
    pub encoding: TextEncoding,
}

/// No candidate encoding could decode a file's attribute table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Failed to decode '{}' with any of the attempted encodings: {}",
    .file.display(),
    .attempted.join(", ")
)]
pub struct DecodeError {
    /// The file whose table could not be decoded.
    pub file: PathBuf,
    /// Every encoding tried, in order (including a sniffed one, if any).
    pub attempted: Vec<String>,
}

/// Parse a comma-separated list of encoding labels.
///
/// Returns the first label that is not recognized as the error.
pub fn parse_encoding_list(list: &str) -> Result<Vec<TextEncoding>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| TextEncoding::from_label(label).ok_or_else(|| label.to_string()))
        .collect()
}

/// The default fallback order.
pub fn default_candidates() -> Vec<TextEncoding> {
    vec![
        TextEncoding::Utf8,
        TextEncoding::Windows1252,
        TextEncoding::Latin1,
    ]
}
