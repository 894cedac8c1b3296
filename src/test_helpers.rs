//! Shared test utilities for the optipix test suite.
//!
//! Synthetic fixtures built in memory, so no test depends on files on disk.
//!
//! # Usage
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let png = encode_fixture(&gradient_rgba(800, 600), ImageFormat::Png);
//! let results = compress(&png, InputFormat::Png, &settings).unwrap();
//! ```

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Pixel fixtures
// =========================================================================

/// Opaque two-axis gradient: red follows x, green follows y.
///
/// Has far more than 256 distinct colours once both edges exceed 16 pixels.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    let span_x = width.saturating_sub(1).max(1);
    let span_y = height.saturating_sub(1).max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / span_x) as u8,
            (y * 255 / span_y) as u8,
            128,
            255,
        ])
    })
}

/// Opaque image with exactly two colours: red left half, blue right half.
pub fn two_tone_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([220, 30, 30, 255])
        } else {
            Rgba([30, 30, 220, 255])
        }
    })
}

/// Opaque deterministic noise. Compresses badly in every lossless format.
pub fn noise_rgba(width: u32, height: u32) -> RgbaImage {
    let mut state: u32 = 0x9E37_79B9;
    RgbaImage::from_fn(width, height, |_, _| {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    })
}

// =========================================================================
// Encoded fixtures
// =========================================================================

/// Encode `img` with the `image` crate's default encoder for `format`.
///
/// JPEG has no alpha, so the image is flattened to RGB first.
pub fn encode_fixture(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let dynamic = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img.clone()).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img.clone()),
    };
    let mut out = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut out, format)
        .unwrap_or_else(|e| panic!("failed to encode {format:?} fixture: {e}"));
    out.into_inner()
}

/// Insert an EXIF APP1 segment carrying `orientation` right after the JPEG
/// SOI marker. The TIFF block is big-endian with a single IFD0 entry.
pub fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let [hi, lo] = orientation.to_be_bytes();

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A"); // big-endian TIFF header
    tiff.extend_from_slice(&8u32.to_be_bytes()); // IFD0 offset
    tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes()); // count
    tiff.extend_from_slice(&[hi, lo, 0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// SVG document of the given size filled edge to edge with an opaque rect.
pub fn svg_fixture(width: u32, height: u32) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect x="0" y="0" width="{width}" height="{height}" fill="#3366cc"/></svg>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn gradient_has_many_colors() {
        let img = gradient_rgba(64, 64);
        let colors: HashSet<_> = img.pixels().map(|p| p.0).collect();
        assert!(colors.len() > 256);
    }

    #[test]
    fn gradient_handles_single_pixel() {
        assert_eq!(gradient_rgba(1, 1).dimensions(), (1, 1));
    }

    #[test]
    fn two_tone_has_two_colors() {
        let img = two_tone_rgba(6, 3);
        let colors: HashSet<_> = img.pixels().map(|p| p.0).collect();
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn encoded_fixtures_decode() {
        let img = gradient_rgba(10, 6);
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP] {
            let bytes = encode_fixture(&img, format);
            assert_eq!(image::guess_format(&bytes).unwrap(), format);
        }
    }
}
