//! Encoder dispatch: which strategy produces each output format.
//!
//! | Format | Quality | Chain |
//! |---|---|---|
//! | SVG | any | vector wrap |
//! | PNG | < 1.0 | palette quantized, then raster encode |
//! | PNG | 1.0 | raster encode |
//! | JPEG, WebP | any | raster encode |
//!
//! Strategies in a chain are tried in order and the first success wins.
//! A failed strategy is logged and the next one runs against the same raster.

use super::backend::{EncodeError, EncoderBackend};
use super::params::{PALETTE_COLORS, Quality};
use super::raster::Raster;
use crate::format::OutputFormat;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Embed a lossless PNG of the raster in an SVG document.
    VectorWrap,
    /// Reduce to a fixed palette and write an indexed PNG.
    PaletteQuantized,
    /// Hand the raster to the format's own encoder.
    RasterEncode,
}

const VECTOR_WRAP: &[Strategy] = &[Strategy::VectorWrap];
const PALETTE_THEN_RASTER: &[Strategy] = &[Strategy::PaletteQuantized, Strategy::RasterEncode];
const RASTER: &[Strategy] = &[Strategy::RasterEncode];

pub fn strategy_chain(format: OutputFormat, quality: Quality) -> &'static [Strategy] {
    match format {
        OutputFormat::Svg => VECTOR_WRAP,
        OutputFormat::Png if !quality.is_max() => PALETTE_THEN_RASTER,
        OutputFormat::Png | OutputFormat::Jpeg | OutputFormat::Webp => RASTER,
    }
}

/// A finished encode job: the bytes plus the strategy that made them.
#[derive(Debug)]
pub struct Encoded {
    pub strategy: Strategy,
    pub bytes: Vec<u8>,
}

/// Run one encode job: walk the chain for `format` until a strategy succeeds.
///
/// Returns the last strategy's error when every strategy in the chain failed.
pub fn run_job(
    backend: &dyn EncoderBackend,
    raster: &Raster,
    format: OutputFormat,
    quality: Quality,
) -> Result<Encoded, EncodeError> {
    let chain = strategy_chain(format, quality);
    let mut last_err = EncodeError::Unsupported { format };

    for &strategy in chain {
        tracing::debug!(%format, ?strategy, "encoding");
        let attempt = match strategy {
            Strategy::VectorWrap => vector_wrap(backend, raster),
            Strategy::PaletteQuantized => backend.quantize(raster, PALETTE_COLORS),
            Strategy::RasterEncode => backend.encode(raster, format, quality),
        };
        match attempt {
            Ok(bytes) => return Ok(Encoded { strategy, bytes }),
            Err(e) => {
                tracing::warn!(%format, ?strategy, error = %e, "encode strategy failed");
                last_err = e;
            }
        }
    }

    Err(last_err)
}

/// `data:<mime>;base64,<payload>`
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn vector_wrap(backend: &dyn EncoderBackend, raster: &Raster) -> Result<Vec<u8>, EncodeError> {
    let png = backend
        .encode_embeddable(raster)
        .map_err(|e| EncodeError::failed(OutputFormat::Svg, e))?;
    let href = data_url(OutputFormat::Png.mime(), &png);
    Ok(svg_document(raster.width(), raster.height(), &href).into_bytes())
}

fn svg_document(width: u32, height: u32, href: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n  <image href=\"{href}\" width=\"{width}\" height=\"{height}\" />\n</svg>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    fn raster() -> Raster {
        Raster::from_rgba(40, 30, vec![200; 40 * 30 * 4]).unwrap()
    }

    // =========================================================================
    // Chain selection
    // =========================================================================

    #[test]
    fn svg_always_wraps() {
        for q in [0.1, 0.8, 1.0] {
            assert_eq!(
                strategy_chain(OutputFormat::Svg, Quality::new(q)),
                &[Strategy::VectorWrap]
            );
        }
    }

    #[test]
    fn lossy_png_tries_palette_first() {
        assert_eq!(
            strategy_chain(OutputFormat::Png, Quality::new(0.8)),
            &[Strategy::PaletteQuantized, Strategy::RasterEncode]
        );
    }

    #[test]
    fn full_quality_png_skips_palette() {
        assert_eq!(
            strategy_chain(OutputFormat::Png, Quality::MAX),
            &[Strategy::RasterEncode]
        );
    }

    #[test]
    fn jpeg_and_webp_encode_directly() {
        for format in [OutputFormat::Jpeg, OutputFormat::Webp] {
            assert_eq!(
                strategy_chain(format, Quality::new(0.5)),
                &[Strategy::RasterEncode]
            );
        }
    }

    // =========================================================================
    // Job execution
    // =========================================================================

    #[test]
    fn quality_one_png_never_touches_quantizer() {
        let backend = MockBackend::new();
        let job = run_job(&backend, &raster(), OutputFormat::Png, Quality::MAX).unwrap();
        assert_eq!(job.strategy, Strategy::RasterEncode);
        assert_eq!(job.bytes, b"encoded:png");
        assert_eq!(backend.quantize_calls(), 0);
    }

    #[test]
    fn palette_result_used_when_quantizer_succeeds() {
        let backend = MockBackend::new();
        let job = run_job(&backend, &raster(), OutputFormat::Png, Quality::new(0.8)).unwrap();
        assert_eq!(job.strategy, Strategy::PaletteQuantized);
        assert_eq!(job.bytes, b"quantized:png");
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Quantize {
                width: 40,
                height: 30,
                colors: PALETTE_COLORS,
            }]
        );
    }

    #[test]
    fn quantizer_failure_falls_back_to_raster_encode() {
        let backend = MockBackend::new().with_failing_quantizer();
        let job = run_job(&backend, &raster(), OutputFormat::Png, Quality::new(0.8)).unwrap();
        assert_eq!(job.strategy, Strategy::RasterEncode);
        assert_eq!(job.bytes, b"encoded:png");
        assert_eq!(backend.quantize_calls(), 1);
    }

    #[test]
    fn both_png_strategies_failing_is_an_error() {
        let backend = MockBackend::failing(&[OutputFormat::Png]).with_failing_quantizer();
        let result = run_job(&backend, &raster(), OutputFormat::Png, Quality::new(0.8));
        assert!(matches!(result, Err(EncodeError::Failed { .. })));
    }

    #[test]
    fn raster_encode_failure_is_reported() {
        let backend = MockBackend::failing(&[OutputFormat::Jpeg]);
        let result = run_job(&backend, &raster(), OutputFormat::Jpeg, Quality::default());
        assert!(result.is_err());
    }

    #[test]
    fn vector_wrap_embeds_png_data_url() {
        let backend = MockBackend::new();
        let job = run_job(&backend, &raster(), OutputFormat::Svg, Quality::default()).unwrap();
        let svg = String::from_utf8(job.bytes).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="40" height="30" viewBox="0 0 40 30""#));
        assert!(svg.contains(&data_url("image/png", b"embeddable:png")));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Embeddable {
                width: 40,
                height: 30
            }]
        );
    }

    #[test]
    fn data_url_is_base64() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }
}
