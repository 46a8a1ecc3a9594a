// SPDX-License-Identifier: GPL-3.0-only

//! Photo capture from the live stream
//!
//! Grabs a single frame from the mounted stream without interrupting it.

use crate::backends::camera::CameraStreamManager;
use crate::backends::camera::types::CameraFrame;
use crate::errors::{CameraError, PhotoError};
use std::sync::Arc;
use tracing::{debug, info};

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Capture the current frame of the mounted stream
    ///
    /// The frame data is reference counted, so the stream keeps running while
    /// the pipeline works on the snapshot.
    pub fn capture_from_stream(stream: &CameraStreamManager) -> Result<Arc<CameraFrame>, PhotoError> {
        info!("Capturing frame from camera stream");

        let frame = stream.snapshot().map_err(|e| match e {
            CameraError::NotAttached => PhotoError::NoFrameAvailable,
            other => PhotoError::InvalidFrame(other.to_string()),
        })?;

        Self::capture_from_frame(frame)
    }

    /// Validate a snapshot and share it with the pipeline
    pub fn capture_from_frame(frame: CameraFrame) -> Result<Arc<CameraFrame>, PhotoError> {
        frame.validate().map_err(PhotoError::InvalidFrame)?;
        debug!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            "Frame captured"
        );
        Ok(Arc::new(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::StreamConstraints;
    use crate::backends::camera::still::StillImageBackend;

    #[test]
    fn test_capture_requires_mounted_stream() {
        let frame = CameraFrame::from_rgba(2, 2, vec![0; 16]);
        let manager = CameraStreamManager::new(Box::new(StillImageBackend::from_frame(frame)));
        assert!(matches!(
            PhotoCapture::capture_from_stream(&manager),
            Err(PhotoError::NoFrameAvailable)
        ));
    }

    #[test]
    fn test_capture_from_mounted_stream() {
        let frame = CameraFrame::from_rgba(4, 2, vec![7; 32]);
        let mut manager = CameraStreamManager::new(Box::new(StillImageBackend::from_frame(frame)));
        manager.mount(&StreamConstraints::default()).unwrap();

        let captured = PhotoCapture::capture_from_stream(&manager).unwrap();
        assert_eq!((captured.width, captured.height), (4, 2));
        assert!(manager.is_attached());
    }

    #[test]
    fn test_capture_from_frame_rejects_short_buffer() {
        let frame = CameraFrame::from_rgba(4, 4, vec![0; 8]);
        assert!(PhotoCapture::capture_from_frame(frame).is_err());
    }
}
