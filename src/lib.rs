//! # Optipix
//!
//! An image compression pipeline. One input image goes in with its declared
//! type; one encoded output per requested format comes out, all at the same
//! size, fitted inside a bounding box.
//!
//! # Architecture: Decode Once, Encode Many
//!
//! ```text
//! 1. Decode     bytes + InputFormat  →  SourceImage   (bitmap or vector)
//! 2. Rasterize  SourceImage + Bounds →  Raster        (exactly once per request)
//! 3. Encode     Raster × formats     →  Vec<EncodedResult>  (concurrent, per-format strategy)
//! ```
//!
//! The raster is read-only and shared by every encode job, which is what
//! guarantees that all results of a request report identical dimensions.
//! A failing format drops out of the result list without failing its
//! siblings.
//!
//! ```
//! use optipix::format::{InputFormat, OutputFormat};
//! use optipix::imaging::{Bounds, Quality};
//! use optipix::pipeline::{CompressionSettings, compress};
//!
//! let img = image::RgbaImage::from_pixel(800, 600, image::Rgba([10, 120, 200, 255]));
//! let mut png = std::io::Cursor::new(Vec::new());
//! img.write_to(&mut png, image::ImageFormat::Png).unwrap();
//!
//! let settings = CompressionSettings {
//!     quality: Quality::new(0.8),
//!     formats: vec![OutputFormat::Jpeg, OutputFormat::Svg],
//!     bounds: Bounds::new(400, 400),
//! };
//! let results = compress(png.get_ref(), InputFormat::Png, &settings).unwrap();
//! assert_eq!(results.len(), 2);
//! assert!(results.iter().all(|r| (r.width(), r.height()) == (400, 300)));
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Closed input/output format tags and the output format table |
//! | [`imaging`] | Decode, rasterize, and the per-format encode strategies |
//! | [`pipeline`] | Request entry point: decode → rasterize → concurrent encode → aggregate |
//! | [`config`] | `config.toml` loading and validation over built-in defaults |
//! | [`naming`] | Download and archive file names derived from a format tag |
//! | [`output`] | Display helpers: byte sizes, savings percentages, batch totals |
//!
//! # Design Decisions
//!
//! ## Closed Format Tags
//!
//! Output formats are an enum backed by one table (MIME, extension, label,
//! default). Adding a format is one table row plus one strategy branch;
//! nothing matches on raw MIME strings.
//!
//! ## Strategies With Local Fallback
//!
//! Lossy PNG is produced by palette quantization. If the quantizer fails or
//! panics, the same job falls back to a plain lossless PNG encode instead of
//! losing the format. SVG output wraps a lossless PNG of the raster, so it
//! can be larger than the original file; that is reported, not treated as
//! an error.
//!
//! ## Pure-Rust Codecs
//!
//! Every decoder and encoder is pure Rust (`image`, `rav1d`, `resvg`,
//! `color_quant`, `png`), so the crate has no system library dependencies.

pub mod config;
pub mod format;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
