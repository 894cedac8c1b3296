//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Bounds;

/// Calculate output dimensions that fit `intrinsic` inside `bounds`.
///
/// - Images already inside the box keep their size. Never upscales.
/// - Otherwise both edges are scaled by `min(max_w / w, max_h / h)` and
///   floored, so floating-point error can never push an edge past its bound.
/// - Both edges are clamped to at least 1 pixel.
///
/// # Examples
/// ```
/// # use optipix::imaging::{Bounds, fit_within};
/// // 800x600 into a 400x400 box: ratio = min(0.5, 0.667) = 0.5
/// assert_eq!(fit_within((800, 600), Bounds::new(400, 400)), (400, 300));
///
/// // Already small enough: untouched
/// assert_eq!(fit_within((100, 50), Bounds::new(1920, 1080)), (100, 50));
/// ```
pub fn fit_within(intrinsic: (u32, u32), bounds: Bounds) -> (u32, u32) {
    let (w, h) = intrinsic;
    let (w, h) = (w.max(1), h.max(1));

    if w <= bounds.max_width && h <= bounds.max_height {
        return (w, h);
    }

    let ratio = f64::min(
        bounds.max_width as f64 / w as f64,
        bounds.max_height as f64 / h as f64,
    );

    let out_w = (w as f64 * ratio).floor() as u32;
    let out_h = (h as f64 * ratio).floor() as u32;

    if out_w == 0 || out_h == 0 {
        tracing::debug!(
            width = w,
            height = h,
            max_width = bounds.max_width,
            max_height = bounds.max_height,
            "degenerate target dimensions clamped to 1px"
        );
    }

    (out_w.max(1), out_h.max(1))
}

/// Whether fitting `intrinsic` into `bounds` requires resampling.
pub fn needs_resize(intrinsic: (u32, u32), bounds: Bounds) -> bool {
    fit_within(intrinsic, bounds) != intrinsic
}
