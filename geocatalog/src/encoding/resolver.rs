//! Fallback-driven encoding resolution.
//!
//! The resolver never guesses up front. It asks the caller to parse the file
//! with each candidate encoding in turn and keeps the first parse that
//! succeeds, so the chosen encoding is always one that decodes the whole
//! table. Only when every candidate fails does it sample the raw bytes and
//! consult the statistical sniffer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{default_candidates, ChardetSniffer, DecodeError, EncodingSniffer, TextEncoding};
use crate::source::{GeoSource, SourceError, Table};

/// Default confidence the sniffer must exceed for its guess to be tried.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.8;

/// Default number of bytes sampled for sniffing.
pub const DEFAULT_SAMPLE_BYTES: usize = 100_000;

/// A successful resolution: the encoding and what was parsed with it.
#[derive(Debug)]
pub struct Resolved<T> {
    pub encoding: TextEncoding,
    pub value: T,
    /// True when the encoding came from the sniffer rather than the
    /// candidate list.
    pub sniffed: bool,
}

/// Errors from [`EncodingResolver::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No encoding decoded the table.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The source failed for a reason unrelated to text decoding.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Resolves the text encoding of attribute tables.
pub struct EncodingResolver {
    candidates: Vec<TextEncoding>,
    sniffer: Box<dyn EncodingSniffer>,
    min_confidence: f32,
    sample_bytes: usize,
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new(default_candidates())
    }
}

impl EncodingResolver {
    /// Create a resolver trying `candidates` in order, with the chardet
    /// sniffer as last resort.
    pub fn new(candidates: Vec<TextEncoding>) -> Self {
        Self {
            candidates,
            sniffer: Box::new(ChardetSniffer),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            sample_bytes: DEFAULT_SAMPLE_BYTES,
        }
    }

    /// Replace the statistical sniffer.
    pub fn with_sniffer(mut self, sniffer: impl EncodingSniffer + 'static) -> Self {
        self.sniffer = Box::new(sniffer);
        self
    }

    /// Set the confidence a sniffed guess must exceed.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Set how many leading bytes of the sample file are sniffed.
    pub fn with_sample_bytes(mut self, sample_bytes: usize) -> Self {
        self.sample_bytes = sample_bytes;
        self
    }

    /// The configured candidate order.
    pub fn candidates(&self) -> &[TextEncoding] {
        &self.candidates
    }

    /// Read one layer's table from `source`, resolving its encoding.
    pub fn read_table(
        &self,
        source: &dyn GeoSource,
        layer: &str,
    ) -> Result<Resolved<Table>, ResolveError> {
        let sample = source.encoding_sample();
        self.resolve(
            source.path(),
            source.declared_encoding(),
            sample.as_deref(),
            |encoding| source.read_rows(layer, encoding),
        )
    }

    /// Run `attempt` with each candidate encoding until one succeeds.
    ///
    /// `declared` (an encoding the file states itself) is tried before the
    /// configured candidates. `sniff_sample` is the file whose leading bytes
    /// are handed to the sniffer once every candidate has failed; pass `None`
    /// for formats that have no such file.
    ///
    /// Attempts failing with a decode error move on to the next encoding; any
    /// other error is returned immediately.
    pub fn resolve<T, F>(
        &self,
        file: &Path,
        declared: Option<TextEncoding>,
        sniff_sample: Option<&Path>,
        mut attempt: F,
    ) -> Result<Resolved<T>, ResolveError>
    where
        F: FnMut(TextEncoding) -> Result<T, SourceError>,
    {
        let mut order: Vec<TextEncoding> = Vec::with_capacity(self.candidates.len() + 1);
        for encoding in declared.into_iter().chain(self.candidates.iter().copied()) {
            if !order.contains(&encoding) {
                order.push(encoding);
            }
        }

        let mut attempted: Vec<TextEncoding> = Vec::new();
        for encoding in order {
            debug!(file = %file.display(), encoding = %encoding, "Trying encoding");
            attempted.push(encoding);
            match attempt(encoding) {
                Ok(value) => {
                    info!(file = %file.display(), encoding = %encoding, "Loaded attribute table");
                    return Ok(Resolved {
                        encoding,
                        value,
                        sniffed: false,
                    });
                }
                Err(err) if err.is_decode() => {
                    debug!(file = %file.display(), encoding = %encoding, error = %err, "Decode failed");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(sample_path) = sniff_sample {
            if let Some(encoding) = self.sniff(sample_path) {
                if attempted.contains(&encoding) {
                    debug!(
                        file = %file.display(),
                        encoding = %encoding,
                        "Sniffed encoding was already tried"
                    );
                } else {
                    attempted.push(encoding);
                    match attempt(encoding) {
                        Ok(value) => {
                            info!(
                                file = %file.display(),
                                encoding = %encoding,
                                "Loaded attribute table with sniffed encoding"
                            );
                            return Ok(Resolved {
                                encoding,
                                value,
                                sniffed: true,
                            });
                        }
                        Err(err) if err.is_decode() => {
                            warn!(
                                file = %file.display(),
                                encoding = %encoding,
                                error = %err,
                                "Sniffed encoding failed to decode"
                            );
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }

        Err(DecodeError {
            file: file.to_path_buf(),
            attempted: attempted.iter().map(|e| e.label().to_string()).collect(),
        }
        .into())
    }

    /// Sniff the leading bytes of `path`, returning the guess only when it is
    /// confident enough.
    fn sniff(&self, path: &Path) -> Option<TextEncoding> {
        if !path.is_file() {
            warn!(file = %path.display(), "Encoding sample file does not exist");
            return None;
        }

        let sample = match read_sample(path, self.sample_bytes) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read encoding sample");
                return None;
            }
        };

        let guess = self.sniffer.sniff(&sample)?;
        info!(
            file = %path.display(),
            encoding = %guess.encoding,
            confidence = guess.confidence,
            "Encoding sniffer guess"
        );

        if guess.confidence > self.min_confidence {
            Some(guess.encoding)
        } else {
            warn!(
                file = %path.display(),
                confidence = guess.confidence,
                min_confidence = self.min_confidence,
                "Sniffer confidence too low, guess rejected"
            );
            None
        }
    }
}

fn read_sample(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut sample = Vec::with_capacity(limit.min(1 << 20));
    File::open(path)?
        .take(limit as u64)
        .read_to_end(&mut sample)?;
    Ok(sample)
}
