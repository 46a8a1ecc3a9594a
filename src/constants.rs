// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// JPEG encoding quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality, matches the usual browser canvas default
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get all preset variants
    pub const ALL: [EncodingQuality; 4] = [
        EncodingQuality::Low,
        EncodingQuality::Medium,
        EncodingQuality::High,
        EncodingQuality::Maximum,
    ];

    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            EncodingQuality::Low => "Low",
            EncodingQuality::Medium => "Medium",
            EncodingQuality::High => "High",
            EncodingQuality::Maximum => "Maximum",
        }
    }
}

/// Capture countdown
pub mod countdown {
    use std::time::Duration;

    /// Default number of ticks before the shutter fires
    pub const DEFAULT_SECONDS: u32 = 10;

    /// Upper bound accepted from configuration or the command line
    pub const MAX_SECONDS: u32 = 60;

    /// Length of one countdown tick
    pub const TICK: Duration = Duration::from_secs(1);
}

/// Camera stream request
pub mod camera {
    /// Preferred capture width (portrait kiosk screen)
    pub const PREFERRED_WIDTH: u32 = 1080;

    /// Preferred capture height
    pub const PREFERRED_HEIGHT: u32 = 1920;

    /// Preferred aspect ratio numerator (width)
    pub const ASPECT_NUM: u32 = 9;

    /// Preferred aspect ratio denominator (height)
    pub const ASPECT_DENOM: u32 = 16;

    /// Seconds to wait for a live pipeline to reach PLAYING
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Seconds to wait for a pipeline to stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Maximum appsink queue (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 60;
}

/// Watermark compositing
pub mod watermark {
    /// Default watermark asset path (relative to the working directory)
    pub const DEFAULT_PATH: &str = "images/udb.png";

    /// Opacity of the image watermark
    pub const OPACITY: f32 = 0.7;

    /// Rotation applied to the whole surface before drawing the watermark
    pub const SURFACE_ROTATION_DEG: f32 = 180.0;

    /// Extra rotation of the watermark about its own center
    pub const WATERMARK_ROTATION_DEG: f32 = -90.0;

    /// Text drawn when the watermark asset cannot be loaded
    pub const FALLBACK_LABEL: &str = "Selfie Kiosk";

    /// Fallback label font size in pixels
    pub const FALLBACK_FONT_SIZE: f32 = 40.0;

    /// Fallback label font families, in preference order
    pub const FALLBACK_FONT_FAMILY: &str = "Arial, Helvetica, sans-serif";

    /// Fallback label alpha (white text)
    pub const FALLBACK_ALPHA: f32 = 0.7;
}

/// Upload collaborator
pub mod upload {
    /// Filename used by the fixed naming policy
    pub const FIXED_FILENAME: &str = "my-image.png";

    /// Request timeout
    pub const TIMEOUT_SECS: u64 = 30;

    /// Local cache file holding the last finished image
    pub const CACHE_FILE: &str = "last-image.json";
}

/// Scannable code display parameters
pub mod code {
    /// Rendered code size in pixels
    pub const SIZE: u32 = 256;

    /// Quiet zone around the code
    pub const INCLUDE_MARGIN: bool = true;

    /// Path segment the viewer-facing service serves uploads from
    pub const IMAGE_ROUTE: &str = "image";
}

/// Directory and file names
pub mod paths {
    /// Application directory name under the config/cache roots
    pub const APP_DIR: &str = "selfie-kiosk";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
