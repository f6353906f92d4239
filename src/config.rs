//! Settings file loading.
//!
//! Effective settings are layered: built-in defaults, then an optional TOML
//! file, then CLI flags (applied by `app`). The file is located by:
//!
//! 1. `--config <path>`, or the `MSD_CONFIG` environment variable (`.env` is
//!    honored); clap resolves both into the same argument
//! 2. `msd.toml` in the working directory, if it exists
//!
//! ```toml
//! [analysis]
//! time_unit = "ms"
//! space_unit = "nm"
//! model = "confined"
//! auto_fit = true
//! r_squared_threshold = 0.9
//!
//! [display]
//! plot_width = 120
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::AnalysisSettings;
use crate::error::AppError;

pub const CONFIG_ENV: &str = "MSD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "msd.toml";

/// Terminal rendering preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub plot_width: usize,
    pub plot_height: usize,
    /// Plot MSD on log-log axes in the terminal.
    pub log_scale: bool,
    /// Show a progress bar while computing MSDs.
    pub progress: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            plot_width: 100,
            plot_height: 25,
            log_scale: false,
            progress: true,
        }
    }
}

/// Contents of a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub analysis: AnalysisSettings,
    pub display: DisplaySettings,
}

/// Where the settings file came from (for diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

/// Load the layered settings file.
///
/// An explicitly requested file (flag or env var) must exist; the implicit
/// `msd.toml` is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<(ConfigFile, ConfigSource), AppError> {
    let path = match explicit.map(Path::to_path_buf) {
        Some(path) => {
            if !path.is_file() {
                return Err(AppError::input(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            path
        }
        None => {
            let implicit = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !implicit.is_file() {
                tracing::debug!("no settings file, using defaults");
                return Ok((ConfigFile::default(), ConfigSource::Defaults));
            }
            implicit
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        tracing::warn!("Failed to read settings at {:?}: {}", path, e);
        AppError::input(format!("Failed to read settings '{}': {e}", path.display()))
    })?;

    let config = parse_config(&content).map_err(|e| e.context(path.display()))?;
    tracing::info!(path = %path.display(), "loaded settings file");
    Ok((config, ConfigSource::File(path)))
}

/// Parse and validate settings from TOML text.
pub fn parse_config(content: &str) -> Result<ConfigFile, AppError> {
    let config: ConfigFile = toml::from_str(content)
        .map_err(|e| AppError::input(format!("Invalid settings file: {e}")))?;
    config.analysis.validate()?;
    if config.display.plot_width < 10 || config.display.plot_height < 5 {
        return Err(AppError::input("Plot size must be at least 10x5."));
    }
    Ok(config)
}
