// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera backend
//!
//! Builds `source ! videoconvert ! videoscale ! RGBA appsink` and keeps the
//! most recent frame in a shared slot the compositor snapshots from.

use super::CameraBackend;
use super::types::*;
use crate::constants::camera as camera_consts;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

type FrameSlot = Arc<Mutex<Option<CameraFrame>>>;

struct LivePipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

/// Live camera backend on top of GStreamer
pub struct GStreamerBackend {
    live: Option<LivePipeline>,
    latest: FrameSlot,
}

impl GStreamerBackend {
    pub fn new() -> Self {
        Self {
            live: None,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    fn init() -> BackendResult<()> {
        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))
    }

    /// Pick the device to open: explicit path first, then a camera whose
    /// location matches the requested facing mode
    fn select_device(&self, constraints: &StreamConstraints) -> Option<String> {
        if let Some(device) = &constraints.device {
            return Some(device.clone());
        }

        let wanted = match constraints.facing {
            FacingMode::User => "front",
            FacingMode::Environment => "back",
        };
        let cameras = self.enumerate_cameras();
        cameras
            .iter()
            .find(|c| c.camera_location.as_deref() == Some(wanted))
            .or_else(|| cameras.first())
            .map(|c| c.path.clone())
            .filter(|path| !path.is_empty())
    }

    /// Candidate pipeline descriptions, most specific first
    fn pipeline_candidates(device: Option<&str>, constraints: &StreamConstraints) -> Vec<String> {
        let source = match device {
            Some(path) => format!("v4l2src device=\"{}\"", path),
            None => "autovideosrc".to_string(),
        };
        let sink = format!(
            "videoconvert ! videoscale ! video/x-raw,format={} ! appsink name=sink",
            PixelFormat::RGBA.to_gst_format_string()
        );

        vec![
            format!(
                "{} ! video/x-raw,width=(int){},height=(int){} ! {}",
                source, constraints.width, constraints.height, sink
            ),
            // Sensor mounted landscape: ask for the rotated mode
            format!(
                "{} ! video/x-raw,width=(int){},height=(int){} ! {}",
                source, constraints.height, constraints.width, sink
            ),
            format!("{} ! {}", source, sink),
        ]
    }

    fn try_create_pipeline(description: &str) -> BackendResult<(gstreamer::Pipeline, AppSink)> {
        let pipeline = gstreamer::parse::launch(description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", camera_consts::MAX_BUFFERS);
        appsink.set_property("drop", true);

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, _) = pipeline.state(gstreamer::ClockTime::from_seconds(
            camera_consts::START_TIMEOUT_SECS,
        ));
        if result.is_err() || state != gstreamer::State::Playing {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(classify_start_failure(&pipeline));
        }

        Ok((pipeline, appsink))
    }

    fn install_frame_callback(appsink: &AppSink, latest: FrameSlot) {
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        format: PixelFormat::from_gst_format(video_info.format().to_str())
                            .unwrap_or(PixelFormat::RGBA),
                        stride: video_info.stride()[0] as u32,
                        captured_at: Instant::now(),
                    };

                    if frame_num % camera_consts::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = frame.width,
                            height = frame.height,
                            "Frame received"
                        );
                    }

                    if let Ok(mut slot) = latest.lock() {
                        *slot = Some(frame);
                    }
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );
    }
}

impl Default for GStreamerBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a pipeline start failure to a backend error using the bus messages
fn classify_start_failure(pipeline: &gstreamer::Pipeline) -> BackendError {
    let Some(bus) = pipeline.bus() else {
        return BackendError::InitializationFailed("Pipeline did not start".to_string());
    };

    while let Some(msg) = bus.pop() {
        if let gstreamer::MessageView::Error(err) = msg.view() {
            let error = err.error();
            if error.matches(gstreamer::ResourceError::NotFound) {
                return BackendError::DeviceNotFound(error.to_string());
            }
            if error.matches(gstreamer::ResourceError::OpenRead)
                || error.matches(gstreamer::ResourceError::NotAuthorized)
            {
                return BackendError::PermissionDenied(error.to_string());
            }
            return BackendError::InitializationFailed(error.to_string());
        }
    }
    BackendError::InitializationFailed("Pipeline did not reach PLAYING".to_string())
}

impl CameraBackend for GStreamerBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::GStreamer
    }

    fn is_available(&self) -> bool {
        Self::init().is_ok()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        if Self::init().is_err() {
            return Vec::new();
        }

        let monitor = gstreamer::DeviceMonitor::new();
        monitor.add_filter(Some("Video/Source"), None);
        if monitor.start().is_err() {
            warn!("Failed to start GStreamer device monitor");
            return Vec::new();
        }

        let cameras = monitor
            .devices()
            .iter()
            .map(|device| {
                let props = device.properties();
                let prop = |key: &str| {
                    props
                        .as_ref()
                        .and_then(|p| p.get::<String>(key).ok())
                };
                CameraDevice {
                    name: device.display_name().to_string(),
                    path: prop("api.v4l2.path")
                        .or_else(|| prop("device.path"))
                        .unwrap_or_default(),
                    camera_location: prop("api.libcamera.location")
                        .or_else(|| prop("camera.location")),
                }
            })
            .collect();

        monitor.stop();
        cameras
    }

    fn start(&mut self, constraints: &StreamConstraints) -> BackendResult<StreamInfo> {
        Self::init()?;
        if self.live.is_some() {
            self.stop()?;
        }

        let device = self.select_device(constraints);
        info!(device = ?device, "Opening GStreamer camera");

        let mut last_error = None;
        for description in Self::pipeline_candidates(device.as_deref(), constraints) {
            debug!(pipeline = %description, "Attempting pipeline");
            match Self::try_create_pipeline(&description) {
                Ok((pipeline, appsink)) => {
                    Self::install_frame_callback(&appsink, Arc::clone(&self.latest));
                    self.live = Some(LivePipeline { pipeline, appsink });
                    info!(pipeline = %description, "GStreamer pipeline playing");

                    // Dimensions become known once the first frame arrives
                    return Ok(StreamInfo {
                        name: device.clone().unwrap_or_else(|| "autovideosrc".to_string()),
                        width: constraints.width,
                        height: constraints.height,
                        tracks: 1,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Pipeline candidate failed");
                    last_error = Some(e);
                }
            }
        }

        error!("All pipeline candidates failed");
        Err(last_error
            .unwrap_or_else(|| BackendError::InitializationFailed("No pipeline".to_string())))
    }

    fn latest_frame(&self) -> BackendResult<CameraFrame> {
        if self.live.is_none() {
            return Err(BackendError::NotStarted);
        }
        self.latest
            .lock()
            .map_err(|_| BackendError::Other("Frame slot poisoned".to_string()))?
            .clone()
            .ok_or_else(|| BackendError::Other("No frame received yet".to_string()))
    }

    fn stop(&mut self) -> BackendResult<()> {
        let Some(live) = self.live.take() else {
            return Ok(());
        };

        info!("Stopping GStreamer pipeline");
        live.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        live.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;
        let _ = live.pipeline.state(gstreamer::ClockTime::from_seconds(
            camera_consts::STOP_TIMEOUT_SECS,
        ));

        if let Ok(mut slot) = self.latest.lock() {
            *slot = None;
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.live.is_some()
    }
}

impl Drop for GStreamerBackend {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
