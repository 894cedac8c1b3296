//! Pure Rust encoder backend.
//!
//! Everything is statically linked; no system codec libraries are needed.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha composited over black) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, best compression) |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless container, channel-quantized below max quality) |
//! | Palette PNG | [`quantizer`](super::quantizer) (`color_quant` + `png`) |
//! | Embeddable PNG | same lossless PNG path as the PNG encoder |

use super::backend::{EncodeError, EncoderBackend};
use super::params::Quality;
use super::quantizer::quantizer;
use super::raster::Raster;
use crate::format::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// JPEG has no alpha channel. Transparent pixels are composited over black.
fn encode_jpeg(raster: &Raster, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let rgb: Vec<u8> = raster
        .pixels()
        .chunks_exact(4)
        .flat_map(|px| {
            let a = px[3] as u32;
            [px[0], px[1], px[2]].map(|c| ((c as u32 * a + 127) / 255) as u8)
        })
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.percent())
        .write_image(&rgb, raster.width(), raster.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::failed(OutputFormat::Jpeg, e))?;
    Ok(out)
}

/// Lossless RGBA PNG. Quality has no effect on this path.
fn encode_png(raster: &Raster) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            raster.pixels(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::failed(OutputFormat::Png, e))?;
    Ok(out)
}

/// WebP through the pure Rust lossless encoder.
///
/// Below max quality the channels are posterized first so the lossless
/// coder sees fewer distinct values; lower quality means fewer levels.
fn encode_webp(raster: &Raster, quality: Quality) -> Result<Vec<u8>, EncodeError> {
    let pixels = if quality.is_max() {
        raster.pixels().to_vec()
    } else {
        posterize(raster.pixels(), quality)
    };

    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out)
        .encode(
            &pixels,
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::failed(OutputFormat::Webp, e))?;
    Ok(out)
}

fn posterize(pixels: &[u8], quality: Quality) -> Vec<u8> {
    let q = quality.value();
    let levels = (2.0 + q * q * 254.0).round().clamp(2.0, 256.0);
    let step = 255.0 / (levels - 1.0);
    pixels
        .chunks_exact(4)
        .flat_map(|px| {
            let snap = |c: u8| ((c as f32 / step).round() * step).round().clamp(0.0, 255.0) as u8;
            // Alpha is left alone so edges keep their coverage.
            [snap(px[0]), snap(px[1]), snap(px[2]), px[3]]
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl EncoderBackend for RustBackend {
    fn encode(
        &self,
        raster: &Raster,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, EncodeError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(raster, quality),
            OutputFormat::Png => encode_png(raster),
            OutputFormat::Webp => encode_webp(raster, quality),
            OutputFormat::Svg => Err(EncodeError::Unsupported { format }),
        }
    }

    fn quantize(&self, raster: &Raster, colors: usize) -> Result<Vec<u8>, EncodeError> {
        // NeuQuant asserts on some degenerate inputs; a panic here must only
        // fail this strategy, not the whole request.
        panic::catch_unwind(AssertUnwindSafe(|| quantizer().encode_png(raster, colors)))
            .map_err(|payload| EncodeError::Panicked {
                format: OutputFormat::Png,
                reason: panic_message(payload.as_ref()),
            })?
            .map_err(|e| EncodeError::failed(OutputFormat::Png, e))
    }

    fn encode_embeddable(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError> {
        encode_png(raster)
    }
}
