// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::{CameraBackendType, CameraFacing};
use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, timing};
use crate::errors::AppError;
use crate::pipelines::photo::EncodingQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current config layout version
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout version of the stored file
    pub version: u32,
    /// Overrides the picture directory photos are saved to and listed from
    pub photos_dir: Option<PathBuf>,
    /// Camera backend to use (GStreamer or test pattern)
    pub backend: CameraBackendType,
    /// Preferred lens when binding the capture screen
    pub lens_facing: CameraFacing,
    /// JPEG quality preset for captured photos
    pub jpeg_quality: EncodingQuality,
    /// How long transient notifications stay visible
    pub notification_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            photos_dir: None,
            backend: CameraBackendType::default(),
            lens_facing: CameraFacing::Back,
            jpeg_quality: EncodingQuality::High,
            notification_secs: timing::NOTIFICATION_SECS,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the user config, falling back to defaults
    ///
    /// A missing file is normal on first start; a malformed one is logged.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Load a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(AppError::Config(format!("{}: {}", path.display(), e))),
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        if config.version != CONFIG_VERSION {
            info!(
                found = config.version,
                expected = CONFIG_VERSION,
                "Config version differs, missing fields use defaults"
            );
        }
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }
}
