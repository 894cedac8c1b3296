//! Parameter types for image operations.
//!
//! These describe *what* to produce, not *how*. They are the interface between
//! the [`pipeline`](crate::pipeline) (which decides what to create) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! - [`Quality`]: lossy encoding quality as a fraction in `(0, 1]`. Clamped on construction.
//! - [`Bounds`]: the max-width/max-height box every output raster must fit in.

use serde::{Deserialize, Serialize};

/// Colour budget for the palette-quantized PNG strategy.
pub const PALETTE_COLORS: usize = 256;

/// Quality setting for lossy encoding, as a fraction in `(0, 1]`.
///
/// `1.0` means "no deliberate loss": PNG stays truecolour and WebP stays lossless.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(f32);

impl Quality {
    pub const MIN: f32 = 0.01;
    pub const MAX: Quality = Quality(1.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(Self::MIN, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale most encoders take.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }

    pub fn is_max(self) -> bool {
        self.0 >= 1.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.8)
    }
}

/// Bounding box for the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Bounds {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}
