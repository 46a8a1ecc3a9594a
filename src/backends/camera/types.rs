// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::camera as camera_consts;
use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// Still image served as a live feed (headless kiosks, demos, tests)
    #[default]
    Still,
    /// Live capture through a GStreamer pipeline
    GStreamer,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Still => write!(f, "still"),
            CameraBackendType::GStreamer => write!(f, "GStreamer"),
        }
    }
}

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the person at the kiosk
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Stream request passed to a backend when the capture page mounts
///
/// Width, height and aspect ratio are preferences, not hard requirements:
/// backends deliver the closest mode they can.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    /// Preferred aspect ratio as (width, height)
    pub aspect_ratio: (u32, u32),
    /// Specific device to open (backend-defined identifier)
    pub device: Option<String>,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: camera_consts::PREFERRED_WIDTH,
            height: camera_consts::PREFERRED_HEIGHT,
            facing: FacingMode::User,
            aspect_ratio: (camera_consts::ASPECT_NUM, camera_consts::ASPECT_DENOM),
            device: None,
        }
    }
}

/// Description of an acquired stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Human readable source name
    pub name: String,
    /// Native frame width delivered by the source
    pub width: u32,
    /// Native frame height delivered by the source
    pub height: u32,
    /// Number of tracks held open by the stream
    pub tracks: usize,
}

impl std::fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Backend-specific identifier used in [`StreamConstraints::device`]
    pub path: String,
    /// Camera location: "front", "back", or "external"
    pub camera_location: Option<String>,
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    /// Canonical format consumed by the compositor
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA | Self::BGRA => 4,
            Self::RGB24 => 3,
            Self::Gray8 => 1,
        }
    }

    /// Convert to a GStreamer video/x-raw format string
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
            Self::RGB24 => "RGB",
            Self::Gray8 => "GRAY8",
        }
    }

    /// Parse format from GStreamer format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "RGBA" | "RGBx" => Some(Self::RGBA),
            "BGRA" | "BGRx" => Some(Self::BGRA),
            "RGB" => Some(Self::RGB24),
            "GRAY8" | "GREY" | "Y8" => Some(Self::Gray8),
            _ => None,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Check that the buffer covers the declared geometry
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("empty frame {}x{}", self.width, self.height));
        }
        let row_bytes = self.width * self.format.bytes_per_pixel();
        if self.stride < row_bytes {
            return Err(format!(
                "stride {} smaller than row size {}",
                self.stride, row_bytes
            ));
        }
        let needed = self.stride as usize * (self.height as usize - 1) + row_bytes as usize;
        if self.data.len() < needed {
            return Err(format!(
                "frame data too small: expected {}, got {}",
                needed,
                self.data.len()
            ));
        }
        Ok(())
    }

    /// Convert to tightly packed, fully opaque RGBA
    pub fn to_rgba(&self) -> Result<Vec<u8>, String> {
        self.validate()?;

        let bpp = self.format.bytes_per_pixel() as usize;
        let width = self.width as usize;
        let mut out = Vec::with_capacity(width * self.height as usize * 4);

        for row in self.data.chunks(self.stride as usize).take(self.height as usize) {
            for px in row[..width * bpp].chunks_exact(bpp) {
                match self.format {
                    PixelFormat::RGBA => out.extend_from_slice(&[px[0], px[1], px[2], 255]),
                    PixelFormat::BGRA => out.extend_from_slice(&[px[2], px[1], px[0], 255]),
                    PixelFormat::RGB24 => out.extend_from_slice(&[px[0], px[1], px[2], 255]),
                    PixelFormat::Gray8 => out.extend_from_slice(&[px[0], px[0], px[0], 255]),
                }
            }
        }

        Ok(out)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend is not available on this system
    #[error("Backend not available: {0}")]
    NotAvailable(String),
    /// Failed to initialize backend
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// Camera device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// Access refused by the OS or the user
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Stream not started
    #[error("Stream not started")]
    NotStarted,
    /// General I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => CameraError::NoCameraFound,
            BackendError::PermissionDenied(_) => CameraError::PermissionDenied,
            BackendError::NotStarted => CameraError::NotAttached,
            BackendError::InitializationFailed(msg) => CameraError::InitializationFailed(msg),
            other => CameraError::BackendError(other.to_string()),
        }
    }
}
