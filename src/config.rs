//! Compression configuration module.
//!
//! Handles loading and validating `config.toml`. Every key has a default; a
//! user file overrides any subset of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! quality = 0.8               # Lossy quality fraction, 0 < q <= 1
//! formats = ["image/jpeg"]    # Output formats (MIME or jpeg/jpg/png/webp/svg)
//! max_width = 1920            # Output raster must fit this box
//! max_height = 1080
//!
//! [processing]
//! max_processes = 4           # Max parallel encoders (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, so override just the values you want:
//!
//! ```toml
//! [compression]
//! formats = ["webp", "png"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::format::OutputFormat;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the settings file looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// What to produce for each input image.
    pub compression: CompressionConfig,
    /// Parallel encoding settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = self.compression.quality;
        if !(q > 0.0 && q <= 1.0) {
            return Err(ConfigError::Validation(
                "compression.quality must be in (0, 1]".into(),
            ));
        }
        if self.compression.max_width == 0 || self.compression.max_height == 0 {
            return Err(ConfigError::Validation(
                "compression.max_width and max_height must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Output settings applied to every compression request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Lossy quality as a fraction. `1.0` disables palette PNG and lossy WebP.
    pub quality: f32,
    /// Requested output formats. An empty list falls back to JPEG.
    pub formats: Vec<OutputFormat>,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality: 0.8,
            formats: OutputFormat::defaults(),
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel encode workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading
// =============================================================================

/// Load config from `config.toml` in the given directory.
///
/// Every section is `#[serde(default)]`, so a sparse file only overrides the
/// keys it names. Unknown keys are rejected and the result is validated.
/// A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(Config::default());
    }
    tracing::debug!(path = %config_path.display(), "loading config");
    let content = fs::read_to_string(&config_path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# Optipix Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# Lossy quality as a fraction, greater than 0 and at most 1.
# At 1.0 PNG stays truecolour and WebP stays lossless; below 1.0 PNG output
# is palette-quantized to 256 colours.
quality = 0.8

# Output formats to produce for each image. Accepts MIME types or the short
# names jpeg, jpg, png, webp, svg. An empty list falls back to JPEG.
formats = ["image/jpeg"]

# The output image is scaled down (never up) to fit inside this box,
# keeping its aspect ratio.
max_width = 1920
max_height = 1080

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel encode workers. Omit for auto (number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.compression.quality, 0.8);
        assert_eq!(config.compression.formats, vec![OutputFormat::Jpeg]);
        assert_eq!(config.compression.max_width, 1920);
        assert_eq!(config.compression.max_height, 1080);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[compression]
quality = 0.5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.compression.quality, 0.5);
        // Defaults preserved
        assert_eq!(config.compression.formats, vec![OutputFormat::Jpeg]);
        assert_eq!(config.compression.max_width, 1920);
    }

    #[test]
    fn parse_formats_as_mime_or_alias() {
        let toml = r#"
[compression]
formats = ["image/webp", "png", "svg", "jpg"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.compression.formats,
            vec![
                OutputFormat::Webp,
                OutputFormat::Png,
                OutputFormat::Svg,
                OutputFormat::Jpeg
            ]
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        let toml = r#"
[compression]
formats = ["image/tiff"]
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
[compression]
qualty = 0.5
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_range() {
        for bad in [0.0, -0.5, 1.5, f32::NAN] {
            let mut config = Config::default();
            config.compression.quality = bad;
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation(_))),
                "quality {bad} should be rejected"
            );
        }
        let mut config = Config::default();
        config.compression.quality = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_zero_bounds() {
        let mut config = Config::default();
        config.compression.max_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = Config::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_format_list_is_valid() {
        let mut config = Config::default();
        config.compression.formats.clear();
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // Threads
    // =========================================================================

    fn cores() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        assert_eq!(effective_threads(&config), cores());
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores());
    }

    #[test]
    fn effective_threads_constrained_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[compression]
quality = 0.6
formats = ["image/png", "image/svg+xml"]

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.compression.quality, 0.6);
        assert_eq!(
            config.compression.formats,
            vec![OutputFormat::Png, OutputFormat::Svg]
        );
        assert_eq!(config.processing.max_processes, Some(2));
        // Unspecified values should be defaults
        assert_eq!(config.compression.max_width, 1920);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_unknown_section_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[thumbnails]\nsize = 3\n").unwrap();

        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn load_config_replaces_format_list() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[compression]\nformats = [\"webp\"]\n",
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.compression.formats, vec![OutputFormat::Webp]);
        assert_eq!(config.compression.max_height, 1080);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[compression]\nquality = 2.0\n").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }
}
