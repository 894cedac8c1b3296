//! Image processing, pure Rust with no system libraries.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Decode** | `image` (JPEG, PNG, WebP, GIF, BMP), `avif-parse` + `rav1d` (AVIF), `resvg::usvg` (SVG) |
//! | **Resize** | `image::imageops::resize` Lanczos3, or `resvg::render` at target size |
//! | **Encode** | `image` codecs, `color_quant` + `png` for palette PNG |
//! | **Vector wrap** | lossless PNG → `base64` → SVG `<image>` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`Quality`] and [`Bounds`]
//! - **Decode / Resize**: bytes → [`SourceImage`] → [`Raster`], once per request
//! - **Backend**: [`EncoderBackend`] trait + [`RustBackend`]
//! - **Strategy**: per-format strategy chains run against the shared raster

pub mod backend;
mod calculations;
pub mod decode;
mod params;
pub mod quantizer;
pub mod raster;
pub mod resize;
pub mod rust_backend;
pub mod strategy;

pub use backend::{EncodeError, EncoderBackend};
pub use calculations::{fit_within, needs_resize};
pub use decode::{DecodeError, SourceImage, decode};
pub use params::{Bounds, PALETTE_COLORS, Quality};
pub use raster::Raster;
pub use resize::rasterize;
pub use rust_backend::RustBackend;
pub use strategy::{Strategy, data_url, run_job, strategy_chain};
