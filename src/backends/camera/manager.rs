// SPDX-License-Identifier: GPL-3.0-only

//! Camera stream lifecycle manager
//!
//! The manager is the only owner of the live stream. Other components get
//! frame snapshots, never the stream itself. Release happens on
//! [`CameraStreamManager::release`] or, at the latest, on drop.

use super::CameraBackend;
use super::types::*;
use crate::errors::CameraError;
use tracing::{debug, info, warn};

/// Camera stream manager
pub struct CameraStreamManager {
    backend: Box<dyn CameraBackend>,
    stream: Option<StreamInfo>,
}

impl CameraStreamManager {
    /// Create a manager around a backend; nothing is acquired yet
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        info!(backend = %backend.backend_type(), "Creating camera stream manager");
        Self {
            backend,
            stream: None,
        }
    }

    /// Get the backend type
    pub fn backend_type(&self) -> CameraBackendType {
        self.backend.backend_type()
    }

    /// Enumerate available cameras
    pub fn enumerate_cameras(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let cameras = self.backend.enumerate_cameras();
        if cameras.is_empty() {
            Err(CameraError::NoCameraFound)
        } else {
            Ok(cameras)
        }
    }

    /// Acquire the stream
    ///
    /// Mounting twice keeps the existing stream.
    pub fn mount(&mut self, constraints: &StreamConstraints) -> Result<StreamInfo, CameraError> {
        if let Some(info) = &self.stream {
            debug!(stream = %info, "Stream already mounted");
            return Ok(info.clone());
        }

        info!(
            width = constraints.width,
            height = constraints.height,
            facing = %constraints.facing,
            device = ?constraints.device,
            "Requesting camera stream"
        );

        if !self.backend.is_available() {
            return Err(CameraError::BackendError(format!(
                "{} backend is not available",
                self.backend.backend_type()
            )));
        }

        match self.backend.start(constraints) {
            Ok(info) => {
                info!(stream = %info, tracks = info.tracks, "Camera stream acquired");
                self.stream = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                // Partially started pipelines must not leak the device
                let _ = self.backend.stop();
                Err(e.into())
            }
        }
    }

    /// Check whether a stream is attached
    pub fn is_attached(&self) -> bool {
        self.stream.is_some() && self.backend.is_active()
    }

    /// Copy of the current frame
    pub fn snapshot(&self) -> Result<CameraFrame, CameraError> {
        if !self.is_attached() {
            return Err(CameraError::NotAttached);
        }
        self.backend.latest_frame().map_err(CameraError::from)
    }

    /// Stop every track and forget the stream
    ///
    /// Safe to call any number of times.
    pub fn release(&mut self) {
        let Some(info) = self.stream.take() else {
            return;
        };

        info!(stream = %info, "Releasing camera stream");
        if let Err(e) = self.backend.stop() {
            warn!(error = %e, "Camera backend reported an error while stopping");
        }
    }
}

impl Drop for CameraStreamManager {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraStreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStreamManager")
            .field("backend_type", &self.backend.backend_type())
            .field("stream", &self.stream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::still::{self, StillImageBackend};

    fn manager() -> (CameraStreamManager, still::StopCounter) {
        let backend = StillImageBackend::from_frame(CameraFrame::from_rgba(4, 2, vec![200; 32]));
        let stops = backend.stop_counter();
        (CameraStreamManager::new(Box::new(backend)), stops)
    }

    #[test]
    fn test_snapshot_requires_mount() {
        let (manager, _) = manager();
        assert_eq!(manager.snapshot().unwrap_err(), CameraError::NotAttached);
    }

    #[test]
    fn test_mount_then_snapshot() {
        let (mut manager, _) = manager();
        let info = manager.mount(&StreamConstraints::default()).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        let frame = manager.snapshot().unwrap();
        assert_eq!(frame.width, 4);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut manager, stops) = manager();
        manager.mount(&StreamConstraints::default()).unwrap();
        manager.release();
        manager.release();
        assert_eq!(stops.count(), 1);
        assert!(!manager.is_attached());
    }

    #[test]
    fn test_drop_releases_stream() {
        let (mut manager, stops) = manager();
        manager.mount(&StreamConstraints::default()).unwrap();
        drop(manager);
        assert_eq!(stops.count(), 1);
    }

    #[test]
    fn test_failed_mount_reports_error() {
        let backend = StillImageBackend::from_path("/nonexistent/kiosk-source.png");
        let mut manager = CameraStreamManager::new(Box::new(backend));
        let err = manager.mount(&StreamConstraints::default()).unwrap_err();
        assert_eq!(err, CameraError::NoCameraFound);
        assert!(!manager.is_attached());
    }
}
