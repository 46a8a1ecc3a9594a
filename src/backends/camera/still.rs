// SPDX-License-Identifier: GPL-3.0-only

//! Still image camera backend
//!
//! Serves one image as if it were a live feed. Used on kiosks without a
//! camera attached, for demos, and in tests.

use super::CameraBackend;
use super::types::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Shared count of stream stops performed by a backend
#[derive(Debug, Clone, Default)]
pub struct StopCounter(Arc<AtomicUsize>);

impl StopCounter {
    /// Number of times a live stream was stopped
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

enum StillSource {
    Path(PathBuf),
    Frame(CameraFrame),
}

/// Backend serving a still image
pub struct StillImageBackend {
    source: StillSource,
    frame: Option<CameraFrame>,
    stops: StopCounter,
}

impl StillImageBackend {
    /// Serve the image at `path`; the file is decoded when the stream starts
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            source: StillSource::Path(path.as_ref().to_path_buf()),
            frame: None,
            stops: StopCounter::default(),
        }
    }

    /// Serve an in-memory frame
    pub fn from_frame(frame: CameraFrame) -> Self {
        Self {
            source: StillSource::Frame(frame),
            frame: None,
            stops: StopCounter::default(),
        }
    }

    /// Handle observing how often the stream was stopped
    pub fn stop_counter(&self) -> StopCounter {
        self.stops.clone()
    }

    fn source_name(&self) -> String {
        match &self.source {
            StillSource::Path(path) => path.display().to_string(),
            StillSource::Frame(_) => "in-memory frame".to_string(),
        }
    }

    fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
        if !path.exists() {
            return Err(BackendError::DeviceNotFound(path.display().to_string()));
        }

        let img = image::open(path).map_err(|e| {
            BackendError::InitializationFailed(format!(
                "Failed to decode {}: {}",
                path.display(),
                e
            ))
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        debug!(path = %path.display(), width, height, "Still image decoded");

        Ok(CameraFrame {
            width,
            height,
            data: Arc::from(rgba.into_raw()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        })
    }
}

impl CameraBackend for StillImageBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Still
    }

    fn is_available(&self) -> bool {
        true
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: format!("Still image: {}", self.source_name()),
            path: self.source_name(),
            camera_location: Some("external".to_string()),
        }]
    }

    fn start(&mut self, constraints: &StreamConstraints) -> BackendResult<StreamInfo> {
        let frame = match &self.source {
            StillSource::Path(path) => Self::load_image_as_frame(path)?,
            StillSource::Frame(frame) => {
                frame
                    .validate()
                    .map_err(BackendError::InitializationFailed)?;
                frame.clone()
            }
        };

        if (frame.width, frame.height) != (constraints.width, constraints.height) {
            debug!(
                requested = ?(constraints.width, constraints.height),
                actual = ?(frame.width, frame.height),
                "Still source does not match the preferred resolution"
            );
        }

        let info = StreamInfo {
            name: self.source_name(),
            width: frame.width,
            height: frame.height,
            tracks: 1,
        };
        info!(source = %info.name, "Still image stream started");
        self.frame = Some(frame);
        Ok(info)
    }

    fn latest_frame(&self) -> BackendResult<CameraFrame> {
        let frame = self.frame.as_ref().ok_or(BackendError::NotStarted)?;
        Ok(CameraFrame {
            captured_at: Instant::now(),
            ..frame.clone()
        })
    }

    fn stop(&mut self) -> BackendResult<()> {
        if self.frame.take().is_some() {
            self.stops.increment();
            debug!("Still image stream stopped");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.frame.is_some()
    }
}
