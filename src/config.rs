use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::gps::DEFAULT_PRECISION;

/// Top-level configuration for the editor.
///
/// Controls where edited images are written and how GPS coordinates are
/// encoded.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_editor::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.in_place = true;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output behavior (dry run, backups, file naming).
    pub output: OutputConfig,
    /// GPS coordinate encoding.
    pub gps: GpsConfig,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would change without writing any file.
    pub dry_run: bool,
    /// If `true`, create a `.bak` copy before overwriting an image in place.
    pub backup_originals: bool,
    /// Overwrite the source image instead of writing a sibling file.
    pub in_place: bool,
    /// Appended to the file stem of the edited copy (`photo.jpg` → `photo_edited.jpg`).
    pub suffix: String,
}

/// How decimal degrees become EXIF rationals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Denominator of every degree/minute/second rational.
    pub precision: i64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup_originals: true,
            in_place: false,
            suffix: "_edited".to_string(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl Config {
    /// Resolve the config file path, in the same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        // degrees up to 180 must still fit an unsigned 32-bit numerator
        if self.gps.precision <= 0 || self.gps.precision > i64::from(u32::MAX) / 180 {
            anyhow::bail!(
                "gps.precision must be between 1 and {}, got {}",
                i64::from(u32::MAX) / 180,
                self.gps.precision
            );
        }
        if !self.output.in_place && self.output.suffix.is_empty() {
            anyhow::bail!("output.suffix must not be empty unless output.in_place is set");
        }
        Ok(())
    }
}
