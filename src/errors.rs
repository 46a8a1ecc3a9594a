// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the photo booth

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Camera acquisition errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Photo capture and compositing errors
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    /// Capture session state errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    /// Upload collaborator errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
    /// Link resolution miss
    #[error(transparent)]
    Lookup(#[from] LookupMiss),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(String),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Camera acquisition errors
///
/// Raised while mounting the capture page. They halt the flow at Idle but
/// never take the page down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No camera devices found
    #[error("No camera devices found")]
    NoCameraFound,
    /// Access to the camera was refused
    #[error("Camera permission denied")]
    PermissionDenied,
    /// Camera initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// Stream is not attached (never mounted or already released)
    #[error("No active camera stream")]
    NotAttached,
    /// Backend error
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Photo capture errors
///
/// These are the only failures that abort a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    /// No stream attached or no frame produced yet
    #[error("No frame available for capture")]
    NoFrameAvailable,
    /// Frame buffer does not match its declared geometry
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    /// Drawing onto the offscreen surface failed
    #[error("Compositing failed: {0}")]
    CompositingFailed(String),
    /// Encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// Save failed
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// Watermark asset could not be loaded or decoded
///
/// Always recovered locally by drawing the fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load watermark '{source_name}': {reason}")]
pub struct AssetLoadError {
    pub source_name: String,
    pub reason: String,
}

/// Capture session errors (invalid state transitions)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Countdown requested while not idle
    #[error("Cannot start countdown while {0}")]
    NotIdle(&'static str),
    /// Retake requested without a captured photo
    #[error("Nothing to retake")]
    NothingToRetake,
    /// Cancel requested but disabled by policy
    #[error("Countdown cancellation is disabled")]
    CancelDisabled,
    /// Cancel requested without an active countdown
    #[error("No countdown in progress")]
    NoCountdown,
    /// Camera stream is not attached
    #[error("Camera is not available")]
    CameraUnavailable,
    /// The page was torn down
    #[error("Session has been torn down")]
    TornDown,
}

/// Upload collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// No endpoint configured
    #[error("Upload endpoint is not configured")]
    NotConfigured,
    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(String),
    /// Backend answered with a non-success status
    #[error("Server responded with status {0}")]
    Status(u16),
    /// Acknowledgment body was not JSON
    #[error("Invalid acknowledgment: {0}")]
    InvalidResponse(String),
    /// Nothing cached locally to retry with
    #[error("No cached image to upload")]
    NothingCached,
}

/// Photo id does not resolve to a stored photo
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Photo not found: {id}")]
pub struct LookupMiss {
    pub id: String,
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => UploadError::Status(status.as_u16()),
            None => UploadError::Request(err.to_string()),
        }
    }
}
