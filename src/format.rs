//! Input and output format tags.
//!
//! Both sides are closed enumerations. Output tags carry everything the rest of
//! the crate needs to know about a format through a single table,
//! [`FORMAT_TABLE`]: MIME string, download extension, display label, and
//! whether the format is selected by default. Adding an output format means one
//! new variant, one table row, and one branch in
//! [`strategy_chain`](crate::imaging::strategy::strategy_chain).
//!
//! | Tag | MIME | Extension | Default |
//! |---|---|---|---|
//! | `Jpeg` | `image/jpeg` | `jpg` | yes |
//! | `Png` | `image/png` | `png` | no |
//! | `Webp` | `image/webp` | `webp` | no |
//! | `Svg` | `image/svg+xml` | `svg` | no |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An output encoding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "image/jpeg", alias = "jpeg", alias = "jpg")]
    Jpeg,
    #[serde(rename = "image/png", alias = "png")]
    Png,
    #[serde(rename = "image/webp", alias = "webp")]
    Webp,
    #[serde(rename = "image/svg+xml", alias = "svg")]
    Svg,
}

/// Static facts about one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub format: OutputFormat,
    pub mime: &'static str,
    pub extension: &'static str,
    pub label: &'static str,
    pub default_enabled: bool,
}

pub const FORMAT_TABLE: &[FormatInfo] = &[
    FormatInfo {
        format: OutputFormat::Jpeg,
        mime: "image/jpeg",
        extension: "jpg",
        label: "JPG",
        default_enabled: true,
    },
    FormatInfo {
        format: OutputFormat::Png,
        mime: "image/png",
        extension: "png",
        label: "PNG",
        default_enabled: false,
    },
    FormatInfo {
        format: OutputFormat::Webp,
        mime: "image/webp",
        extension: "webp",
        label: "WEBP",
        default_enabled: false,
    },
    FormatInfo {
        format: OutputFormat::Svg,
        mime: "image/svg+xml",
        extension: "svg",
        label: "SVG",
        default_enabled: false,
    },
];

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Svg,
    ];

    /// The format used when a request names no formats at all.
    pub const FALLBACK: OutputFormat = OutputFormat::Jpeg;

    pub fn info(self) -> &'static FormatInfo {
        // Every variant has exactly one row; the index mirrors declaration order.
        &FORMAT_TABLE[self as usize]
    }

    pub fn mime(self) -> &'static str {
        self.info().mime
    }

    pub fn extension(self) -> &'static str {
        self.info().extension
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|info| info.mime.eq_ignore_ascii_case(mime.trim()))
            .map(|info| info.format)
    }

    /// Formats selected when the caller has not chosen any.
    pub fn defaults() -> Vec<OutputFormat> {
        FORMAT_TABLE
            .iter()
            .filter(|info| info.default_enabled)
            .map(|info| info.format)
            .collect()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown output format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Accepts a MIME string or a short alias (`jpg`, `jpeg`, `png`, `webp`, `svg`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(format) = OutputFormat::from_mime(s) {
            return Ok(format);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// A declared input type the decoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Avif,
    Svg,
}

const INPUT_MIME_TABLE: &[(&str, InputFormat)] = &[
    ("image/jpeg", InputFormat::Jpeg),
    ("image/png", InputFormat::Png),
    ("image/webp", InputFormat::Webp),
    ("image/gif", InputFormat::Gif),
    ("image/bmp", InputFormat::Bmp),
    ("image/avif", InputFormat::Avif),
    ("image/svg+xml", InputFormat::Svg),
];

/// MIME types accepted at the upload boundary.
pub const SUPPORTED_INPUT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/avif",
    "image/svg+xml",
];

impl InputFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        INPUT_MIME_TABLE
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(mime))
            .map(|(_, format)| *format)
    }

    pub fn mime(self) -> &'static str {
        INPUT_MIME_TABLE
            .iter()
            .find(|(_, format)| *format == self)
            .map(|(m, _)| *m)
            .unwrap_or("application/octet-stream")
    }
}

/// Outcome of filtering a batch of declared MIME types.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partitioned {
    /// Indices (into the input slice) of accepted entries, with their format.
    pub accepted: Vec<(usize, InputFormat)>,
    /// How many entries were rejected. Only the count is surfaced to users.
    pub rejected: usize,
}

/// Split declared MIME types into accepted inputs and a rejected count.
pub fn partition_supported<S: AsRef<str>>(mimes: &[S]) -> Partitioned {
    let mut out = Partitioned::default();
    for (idx, mime) in mimes.iter().enumerate() {
        match InputFormat::from_mime(mime.as_ref()) {
            Some(format) => out.accepted.push((idx, format)),
            None => out.rejected += 1,
        }
    }
    out
}
