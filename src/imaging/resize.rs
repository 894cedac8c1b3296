//! Resizer: draw a decoded source into the output-sized [`Raster`].
//!
//! Runs exactly once per request. Every output format is encoded from the
//! raster this produces, so all results share its dimensions.

use super::calculations::{fit_within, needs_resize};
use super::decode::{DecodeError, SourceImage, VectorImage};
use super::params::Bounds;
use super::raster::Raster;
use image::imageops::{self, FilterType};
use resvg::tiny_skia;

/// Fit `source` inside `bounds` and draw it at that size.
///
/// Consumes the source: the decoded image is dropped when this returns,
/// whether or not drawing succeeded.
pub fn rasterize(source: SourceImage, bounds: Bounds) -> Result<Raster, DecodeError> {
    let intrinsic = source.dimensions();
    let (width, height) = fit_within(intrinsic, bounds);
    tracing::debug!(
        from_width = intrinsic.0,
        from_height = intrinsic.1,
        width,
        height,
        "rasterizing"
    );

    match source {
        SourceImage::Bitmap(img) => {
            let rgba = img.into_rgba8();
            if !needs_resize(intrinsic, bounds) {
                return Ok(Raster::from(rgba));
            }
            Ok(Raster::from(imageops::resize(
                &rgba,
                width,
                height,
                FilterType::Lanczos3,
            )))
        }
        SourceImage::Vector(svg) => draw_vector(&svg, width, height),
    }
}

/// Render an SVG straight at the target size with one uniform scale transform.
fn draw_vector(svg: &VectorImage, width: u32, height: u32) -> Result<Raster, DecodeError> {
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(DecodeError::Rasterize { width, height })?;

    let transform = tiny_skia::Transform::from_scale(
        width as f32 / svg.width,
        height as f32 / svg.height,
    );
    resvg::render(&svg.tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; encoders expect straight alpha.
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    Raster::from_rgba(width, height, rgba).ok_or(DecodeError::Rasterize { width, height })
}
