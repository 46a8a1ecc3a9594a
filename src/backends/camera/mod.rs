// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Booth (session)   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraStreamManager │  ← Exclusive owner, guaranteed release
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//!  ┌───────┐   ┌──────────┐
//!  │ Still │   │GStreamer │
//!  └───────┘   └──────────┘
//! ```

pub mod manager;
pub mod still;
pub mod types;

#[cfg(feature = "gstreamer")]
pub mod gstreamer;

pub use manager::CameraStreamManager;
pub use types::*;

use crate::config::CameraSettings;

/// Camera backend trait
///
/// A backend owns the device-side resources of one stream. Everything
/// acquired in [`CameraBackend::start`] must be released by
/// [`CameraBackend::stop`], which must be safe to call repeatedly.
pub trait CameraBackend: Send {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend can run on the current system
    fn is_available(&self) -> bool;

    /// Enumerate cameras reachable through this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Acquire a stream matching `constraints` as closely as possible
    ///
    /// # Returns
    /// * `Ok(StreamInfo)` - Stream is live and frames can be read
    /// * `Err(BackendError)` - Device missing, access denied or pipeline failure
    fn start(&mut self, constraints: &StreamConstraints) -> BackendResult<StreamInfo>;

    /// Copy of the most recent frame
    ///
    /// Returns `BackendError::NotStarted` when no stream is live and
    /// `BackendError::Other` while a live stream has not produced a frame yet.
    fn latest_frame(&self) -> BackendResult<CameraFrame>;

    /// Stop every track of the stream and release the device
    fn stop(&mut self) -> BackendResult<()>;

    /// Check whether a stream is currently live
    fn is_active(&self) -> bool;
}

/// Create the backend selected in the camera settings
pub fn backend_from_settings(settings: &CameraSettings) -> BackendResult<Box<dyn CameraBackend>> {
    match settings.backend {
        CameraBackendType::Still => {
            let path = settings.source_path.as_ref().ok_or_else(|| {
                BackendError::DeviceNotFound("no still image source configured".to_string())
            })?;
            Ok(Box::new(still::StillImageBackend::from_path(path)))
        }
        #[cfg(feature = "gstreamer")]
        CameraBackendType::GStreamer => Ok(Box::new(gstreamer::GStreamerBackend::new())),
        #[cfg(not(feature = "gstreamer"))]
        CameraBackendType::GStreamer => Err(BackendError::NotAvailable(
            "built without the `gstreamer` feature".to_string(),
        )),
    }
}
