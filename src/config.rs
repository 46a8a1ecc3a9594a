// SPDX-License-Identifier: GPL-3.0-only

//! Kiosk configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/selfie-kiosk/config.json`. Every field
//! has a default, so a partial file is valid and a missing file means
//! "all defaults".

use crate::backends::camera::{CameraBackendType, FacingMode, StreamConstraints};
use crate::constants::{self, EncodingQuality};
use crate::errors::{AppError, AppResult};
use crate::link::{CodeDisplay, LinkPolicy};
use crate::pipelines::photo::Viewport;
use crate::upload::UploadNaming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Camera selection and stream preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Device identifier for live backends (e.g. /dev/video0)
    pub device: Option<String>,
    /// Image served by the still backend
    pub source_path: Option<PathBuf>,
    /// Preferred width
    pub width: u32,
    /// Preferred height
    pub height: u32,
    /// Which camera to prefer
    pub facing: FacingMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            device: None,
            source_path: None,
            width: constants::camera::PREFERRED_WIDTH,
            height: constants::camera::PREFERRED_HEIGHT,
            facing: FacingMode::User,
        }
    }
}

impl CameraSettings {
    /// Stream request derived from these settings
    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            width: self.width,
            height: self.height,
            facing: self.facing,
            device: self.device.clone(),
            ..StreamConstraints::default()
        }
    }
}

/// Watermark asset and fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    /// Watermark image path
    pub path: PathBuf,
    /// Watermark opacity (0.0 - 1.0)
    pub opacity: f32,
    /// Text drawn when the watermark cannot be loaded
    pub fallback_label: String,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::watermark::DEFAULT_PATH),
            opacity: constants::watermark::OPACITY,
            fallback_label: constants::watermark::FALLBACK_LABEL.to_string(),
        }
    }
}

/// Upload collaborator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Upload endpoint; uploads are disabled when unset
    pub endpoint: Option<String>,
    /// How uploaded files are named
    pub naming: UploadNaming,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Keep the last finished image on disk for `upload-last`
    pub cache_last_image: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            naming: UploadNaming::default(),
            timeout_secs: constants::upload::TIMEOUT_SECS,
            cache_last_image: true,
        }
    }
}

/// Link resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LinkSettings {
    /// What the scannable code encodes
    pub policy: LinkPolicy,
    /// Display parameters handed to the code renderer
    pub code: CodeDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Countdown length in seconds
    pub countdown_seconds: u32,
    /// Allow aborting a running countdown
    pub allow_countdown_cancel: bool,
    /// Camera settings
    pub camera: CameraSettings,
    /// Kiosk display size, used to decide capture orientation
    pub viewport: Viewport,
    /// Watermark settings
    pub watermark: WatermarkSettings,
    /// JPEG quality preset
    pub jpeg_quality: EncodingQuality,
    /// Upload settings
    pub upload: UploadSettings,
    /// Link settings
    pub link: LinkSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countdown_seconds: constants::countdown::DEFAULT_SECONDS,
            allow_countdown_cancel: false, // no cancel path unless enabled explicitly
            camera: CameraSettings::default(),
            viewport: Viewport::default(),
            watermark: WatermarkSettings::default(),
            jpeg_quality: EncodingQuality::default(),
            upload: UploadSettings::default(),
            link: LinkSettings::default(),
        }
    }
}

impl Config {
    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::paths::APP_DIR)
                .join(constants::paths::CONFIG_FILE)
        })
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this system, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> AppResult<()> {
        if self.countdown_seconds == 0
            || self.countdown_seconds > constants::countdown::MAX_SECONDS
        {
            return Err(AppError::Config(format!(
                "countdown_seconds must be between 1 and {}",
                constants::countdown::MAX_SECONDS
            )));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(AppError::Config(
                "watermark.opacity must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(AppError::Config("viewport must not be empty".to_string()));
        }
        if let Some(endpoint) = &self.upload.endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(AppError::Config(format!(
                "upload.endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
        if let LinkPolicy::Remote { public_base } = &self.link.policy
            && public_base.trim().is_empty()
        {
            return Err(AppError::Config(
                "link.policy.public_base must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
