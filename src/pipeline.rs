//! Compression pipeline: one input image in, one result per requested format out.
//!
//! ## Stages
//!
//! ```text
//! bytes ──decode──▶ SourceImage ──rasterize (once)──▶ Raster ──┬─▶ encode JPEG ─┐
//!                                                              ├─▶ encode PNG  ─┼─▶ Vec<EncodedResult>
//!                                                              └─▶ wrap SVG    ─┘
//! ```
//!
//! The source is decoded and resized exactly once. Every encode job borrows
//! the same read-only [`Raster`], so all results for a request share its
//! dimensions; only their byte sizes differ.
//!
//! ## Failure model
//!
//! - A decode failure rejects the whole request ([`CompressError::Decode`]).
//! - An encode failure is local to its format. The request still resolves
//!   with every format that did succeed.
//! - Only when no format at all could be encoded does the request fail
//!   ([`CompressError::NoFormatSucceeded`]).
//!
//! ## Parallel Processing
//!
//! Encode jobs run concurrently on the global [rayon](https://docs.rs/rayon)
//! pool. Call [`init_thread_pool`] once at startup to cap its size.

use crate::config::{CompressionConfig, ProcessingConfig, effective_threads};
use crate::format::{InputFormat, OutputFormat};
use crate::imaging::{
    Bounds, DecodeError, EncoderBackend, Quality, Raster, RustBackend, Strategy, data_url, decode,
    rasterize, run_job,
};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] DecodeError),
    #[error("No output format could be encoded (attempted {attempted:?})")]
    NoFormatSucceeded { attempted: Vec<OutputFormat> },
}

/// Runtime settings for one compression request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionSettings {
    pub quality: Quality,
    /// Requested output formats. Empty means [`OutputFormat::FALLBACK`].
    pub formats: Vec<OutputFormat>,
    pub bounds: Bounds,
}

impl CompressionSettings {
    /// Build settings from the `[compression]` section of the config file.
    pub fn from_config(config: &CompressionConfig) -> Self {
        Self {
            quality: Quality::new(config.quality),
            formats: config.formats.clone(),
            bounds: Bounds::new(config.max_width, config.max_height),
        }
    }

    /// The formats a request will actually encode.
    pub fn effective_formats(&self) -> Vec<OutputFormat> {
        if self.formats.is_empty() {
            vec![OutputFormat::FALLBACK]
        } else {
            self.formats.clone()
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}

/// One encoded output. Immutable once built; the caller owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult {
    format: OutputFormat,
    strategy: Strategy,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl EncodedResult {
    fn new(format: OutputFormat, strategy: Strategy, bytes: Vec<u8>, raster: &Raster) -> Self {
        Self {
            format,
            strategy,
            bytes,
            width: raster.width(),
            height: raster.height(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Which strategy produced the bytes (e.g. whether the palette path ran).
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the encoded output.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// `data:` URL for inline previews.
    pub fn to_data_url(&self) -> String {
        data_url(self.format.mime(), &self.bytes)
    }
}

/// Compress one image with the production encoder backend.
pub fn compress(
    data: &[u8],
    input: InputFormat,
    settings: &CompressionSettings,
) -> Result<Vec<EncodedResult>, CompressError> {
    compress_with_backend(&RustBackend::new(), data, input, settings)
}

/// Compress using a specific backend (allows testing with mock).
///
/// Results are in no guaranteed order; match on [`EncodedResult::format`].
pub fn compress_with_backend(
    backend: &impl EncoderBackend,
    data: &[u8],
    input: InputFormat,
    settings: &CompressionSettings,
) -> Result<Vec<EncodedResult>, CompressError> {
    let formats = settings.effective_formats();

    // The decoded source is consumed here; only the raster outlives this line.
    let raster = rasterize(decode(data, input)?, settings.bounds)?;
    tracing::debug!(
        input = input.mime(),
        width = raster.width(),
        height = raster.height(),
        formats = formats.len(),
        quality = settings.quality.value(),
        "raster ready"
    );

    let results: Vec<EncodedResult> = formats
        .par_iter()
        .filter_map(
            |&format| match run_job(backend, &raster, format, settings.quality) {
                Ok(encoded) => Some(EncodedResult::new(
                    format,
                    encoded.strategy,
                    encoded.bytes,
                    &raster,
                )),
                Err(e) => {
                    tracing::warn!(%format, error = %e, "dropping format from results");
                    None
                }
            },
        )
        .collect();

    if results.is_empty() {
        return Err(CompressError::NoFormatSucceeded { attempted: formats });
    }
    Ok(results)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
/// Only the first call takes effect; later calls leave the pool as it is.
pub fn init_thread_pool(processing: &ProcessingConfig) {
    let threads = effective_threads(processing);
    if rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .is_ok()
    {
        tracing::debug!(threads, "encode thread pool initialized");
    }
}
