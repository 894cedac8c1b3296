//! Encoder backend trait and shared error type.
//!
//! The [`EncoderBackend`] trait defines the three encode primitives every
//! strategy is built from:
//!
//! | Primitive | Used by |
//! |---|---|
//! | [`encode`](EncoderBackend::encode) | default raster-encode strategy (and the palette fallback) |
//! | [`quantize`](EncoderBackend::quantize) | palette-quantized PNG strategy |
//! | [`encode_embeddable`](EncoderBackend::encode_embeddable) | vector-wrap strategy |
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests swap in a recording
//! mock to force failures and observe which primitives ran.

use super::params::Quality;
use super::raster::Raster;
use crate::format::OutputFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{format} encode failed: {reason}")]
    Failed {
        format: OutputFormat,
        reason: String,
    },
    #[error("{format} encoder panicked: {reason}")]
    Panicked {
        format: OutputFormat,
        reason: String,
    },
    #[error("{format} is not a raster encoding target")]
    Unsupported { format: OutputFormat },
}

impl EncodeError {
    pub fn failed(format: OutputFormat, reason: impl ToString) -> Self {
        EncodeError::Failed {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Trait for encoder backends.
///
/// Implementations only read the raster. They must be `Sync`: one backend is
/// shared by every concurrent encode job of a request.
pub trait EncoderBackend: Sync {
    /// Encode with the format's native encoder at the given quality.
    fn encode(
        &self,
        raster: &Raster,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError>;

    /// Reduce to at most `colors` palette entries and write an indexed PNG.
    fn quantize(&self, raster: &Raster, colors: usize) -> Result<Vec<u8>, EncodeError>;

    /// Lossless PNG suitable for embedding in another document.
    fn encode_embeddable(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError>;
}
