//! Download filenames for encoded results.
//!
//! Every output takes the original file's stem and the extension of its
//! format tag:
//! - `holiday.png` + JPEG → `holiday.jpg`
//! - `scan.final.bmp` + WebP → `scan.final.webp`
//! - `README` + SVG → `README.svg`
//! - `photo.jpg.heic` + JPEG → `photo.jpg` (extension not doubled)
//!
//! Batch downloads place every file under [`ARCHIVE_FOLDER`] inside an
//! archive named [`ARCHIVE_NAME`].

use crate::format::OutputFormat;

/// Folder every entry of a batch archive lives in.
pub const ARCHIVE_FOLDER: &str = "optipix-compressed";
/// File name of the batch archive.
pub const ARCHIVE_NAME: &str = "optipix-images.zip";

/// Result of splitting a file name at its last dot.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFileName<'a> {
    /// Everything before the last `.`, or the whole name when there is none.
    pub stem: &'a str,
    /// Text after the last `.`, if any.
    pub extension: Option<&'a str>,
}

/// Split `name` at its last dot.
///
/// - `"a.b.png"` → stem=`"a.b"`, extension=`Some("png")`
/// - `"README"` → stem=`"README"`, extension=`None`
/// - `".env"` → stem=`".env"`, extension=`None` (a leading dot is not a separator)
pub fn parse_file_name(name: &str) -> ParsedFileName<'_> {
    match name.rfind('.') {
        Some(pos) if pos > 0 => ParsedFileName {
            stem: &name[..pos],
            extension: Some(&name[pos + 1..]),
        },
        _ => ParsedFileName {
            stem: name,
            extension: None,
        },
    }
}

/// File name for `format`'s output of the file originally called `original`.
pub fn output_file_name(original: &str, format: OutputFormat) -> String {
    let stem = parse_file_name(original).stem;
    let suffix = format!(".{}", format.extension());
    if stem.ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{stem}{suffix}")
    }
}

/// Path of an output inside the batch archive, e.g. `optipix-compressed/cat.webp`.
pub fn archive_entry_path(original: &str, format: OutputFormat) -> String {
    format!("{ARCHIVE_FOLDER}/{}", output_file_name(original, format))
}
