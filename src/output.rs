//! Display formatting for compression results.
//!
//! Pure helpers the caller's UI uses to present results. Nothing here does I/O.
//!
//! # Output Format
//!
//! ```text
//! holiday.png (2.41 MB)
//!     JPG holiday.jpg 312.4 KB (-87%)
//!     SVG holiday.svg 3.1 MB (+29%)
//!
//! 2 files, 4 outputs: 3.5 MB → 1.2 MB (-66%)
//! ```
//!
//! Sizes are 1024-based with at most two decimals and trailing zeros
//! dropped. Percentages are relative to the original file: negative means
//! the output is smaller, positive means it grew (common for SVG wrapping).

use crate::naming::output_file_name;
use crate::pipeline::EncodedResult;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

// ============================================================================
// Sizes and percentages
// ============================================================================

/// Human-readable byte size: `0 B`, `512 B`, `1.5 KB`, `2.41 MB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", trim_decimals(value), UNITS[unit])
}

/// Two decimals, then drop trailing zeros and a dangling point.
fn trim_decimals(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Size change relative to the original, rounded to a whole percent.
///
/// Negative when the output is smaller. `None` for an empty original.
/// Halves round up (towards positive), so `-12.5` becomes `-12`.
pub fn savings_percent(original: u64, compressed: u64) -> Option<i64> {
    if original == 0 {
        return None;
    }
    let change = (compressed as f64 - original as f64) / original as f64 * 100.0;
    Some((change + 0.5).floor() as i64)
}

/// `-40%`, `+12%`, `+0%`; `n/a` when there is no original size.
pub fn format_percent(percent: Option<i64>) -> String {
    match percent {
        Some(p) if p < 0 => format!("{p}%"),
        Some(p) => format!("+{p}%"),
        None => "n/a".to_string(),
    }
}

// ============================================================================
// Result lines
// ============================================================================

/// One line per result: label, download name, size, change.
///
/// ```text
/// WEBP cat.webp 18.2 KB (-71%)
/// ```
pub fn format_result_line(original_name: &str, original_size: u64, result: &EncodedResult) -> String {
    let size = result.size() as u64;
    format!(
        "{} {} {} ({})",
        result.format().label(),
        output_file_name(original_name, result.format()),
        format_size(size),
        format_percent(savings_percent(original_size, size)),
    )
}

/// Header line for the original file plus an indented line per result.
pub fn format_file_results(
    original_name: &str,
    original_size: u64,
    results: &[EncodedResult],
) -> Vec<String> {
    let mut lines = vec![format!("{original_name} ({})", format_size(original_size))];
    lines.extend(
        results
            .iter()
            .map(|r| format!("    {}", format_result_line(original_name, original_size, r))),
    );
    lines
}

// ============================================================================
// Batch totals
// ============================================================================

/// Running totals across a batch of compressed files.
///
/// Each original counts once; every output of it counts towards
/// `compressed_bytes`, so requesting several formats can make the batch
/// "grow".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub outputs: usize,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one original file and everything produced from it.
    pub fn add(&mut self, original_size: u64, results: &[EncodedResult]) {
        self.files += 1;
        self.outputs += results.len();
        self.original_bytes += original_size;
        self.compressed_bytes += results.iter().map(|r| r.size() as u64).sum::<u64>();
    }

    /// Bytes saved overall. Negative when the outputs are larger.
    pub fn saved_bytes(&self) -> i64 {
        self.original_bytes as i64 - self.compressed_bytes as i64
    }

    pub fn savings_percent(&self) -> Option<i64> {
        savings_percent(self.original_bytes, self.compressed_bytes)
    }

    /// `2 files, 4 outputs: 3.5 MB → 1.2 MB (-66%)`
    pub fn format_line(&self) -> String {
        format!(
            "{} {}, {} {}: {} → {} ({})",
            self.files,
            plural(self.files, "file", "files"),
            self.outputs,
            plural(self.outputs, "output", "outputs"),
            format_size(self.original_bytes),
            format_size(self.compressed_bytes),
            format_percent(self.savings_percent()),
        )
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
