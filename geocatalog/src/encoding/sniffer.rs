//! Statistical encoding detection.

use super::TextEncoding;

/// A guess produced by an [`EncodingSniffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingGuess {
    /// The guessed encoding.
    pub encoding: TextEncoding,
    /// Detector confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

/// Guesses the encoding of a raw byte sample.
pub trait EncodingSniffer: Send + Sync {
    /// Returns `None` when the detector has no usable guess at all.
    fn sniff(&self, sample: &[u8]) -> Option<EncodingGuess>;
}

/// Detector backed by the `chardet` crate (a port of the universal charset
/// detector).
#[derive(Debug, Default, Clone, Copy)]
pub struct ChardetSniffer;

impl EncodingSniffer for ChardetSniffer {
    fn sniff(&self, sample: &[u8]) -> Option<EncodingGuess> {
        let sample = sample.to_vec();
        let (charset, confidence, _language) = chardet::detect(&sample);
        if charset.is_empty() {
            return None;
        }

        let label = chardet::charset2encoding(&charset);
        let encoding = TextEncoding::from_label(label)?;
        tracing::debug!(
            charset = %charset,
            confidence,
            encoding = %encoding,
            "chardet guess"
        );
        Some(EncodingGuess {
            encoding,
            confidence,
        })
    }
}
