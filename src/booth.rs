// SPDX-License-Identifier: GPL-3.0-only

//! The capture page
//!
//! [`Booth`] owns one camera stream and one capture session and wires them to
//! the photo pipeline and link resolver. It publishes events but never calls
//! the uploader.
//!
//! # Lifecycle
//!
//! ```text
//! mount ─▶ start_countdown ─▶ run_countdown ─▶ (photo on display) ─▶ retake ─┐
//!   ▲                                                                         │
//!   └─────────────────────────────────────────────────────────────────────────┘
//! teardown (any time): countdown stops, photo deleted, camera released
//! ```

use crate::backends::camera::{CameraStreamManager, StreamInfo, backend_from_settings};
use crate::config::Config;
use crate::errors::{AppError, AppResult, CameraError, LookupMiss, SessionError};
use crate::events::{EventBus, PhotoEvent};
use crate::link::{CodePayload, LinkResolver};
use crate::pipelines::photo::{CapturedPhoto, PhotoCapture, PhotoPipeline};
use crate::session::{CaptureOrchestrator, CaptureState, TickOutcome};
use crate::storage::{PhotoId, PhotoRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};
use tracing::{error, info, warn};

/// Signals teardown from outside the booth (e.g. a Ctrl-C handler)
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl TeardownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once teardown has been triggered
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        torn_down(&mut rx).await;
    }
}

/// One kiosk capture page
pub struct Booth {
    config: Config,
    camera: CameraStreamManager,
    orchestrator: CaptureOrchestrator,
    pipeline: PhotoPipeline,
    resolver: LinkResolver,
    registry: PhotoRegistry,
    events: EventBus,
    shutdown: TeardownHandle,
    teardown_rx: watch::Receiver<bool>,
}

impl Booth {
    pub fn new(
        config: Config,
        camera: CameraStreamManager,
        registry: PhotoRegistry,
        events: EventBus,
    ) -> Self {
        let pipeline = PhotoPipeline::from_config(&config, registry.clone(), events.clone());
        let resolver = LinkResolver::new(
            registry.clone(),
            config.link.policy.clone(),
            config.upload.naming.clone(),
            config.link.code,
        );
        let orchestrator =
            CaptureOrchestrator::new(config.countdown_seconds, config.allow_countdown_cancel);
        let (tx, teardown_rx) = watch::channel(false);

        Self {
            config,
            camera,
            orchestrator,
            pipeline,
            resolver,
            registry,
            events,
            shutdown: TeardownHandle { tx: Arc::new(tx) },
            teardown_rx,
        }
    }

    /// Booth with the camera backend named in the config
    pub fn from_config(config: Config, registry: PhotoRegistry, events: EventBus) -> AppResult<Self> {
        let backend = backend_from_settings(&config.camera).map_err(CameraError::from)?;
        Ok(Self::new(
            config,
            CameraStreamManager::new(backend),
            registry,
            events,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.orchestrator.state()
    }

    pub fn registry(&self) -> &PhotoRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn camera(&self) -> &CameraStreamManager {
        &self.camera
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.shutdown.clone()
    }

    /// Acquire the camera
    ///
    /// Failure is notified and leaves the booth usable but unable to capture.
    /// There is no automatic retry.
    pub fn mount(&mut self) -> Result<StreamInfo, CameraError> {
        if self.orchestrator.is_torn_down() {
            return Err(CameraError::NotAttached);
        }

        match self.camera.mount(&self.config.camera.constraints()) {
            Ok(info) => Ok(info),
            Err(e) => {
                error!(error = %e, "Error accessing camera");
                self.events.error(format!("Camera unavailable: {}", e));
                Err(e)
            }
        }
    }

    /// Idle → CountingDown; needs an attached camera
    pub fn start_countdown(&mut self) -> Result<u32, SessionError> {
        if !self.orchestrator.is_torn_down() && !self.camera.is_attached() {
            return Err(SessionError::CameraUnavailable);
        }
        self.orchestrator.start_countdown()
    }

    /// Drive the running countdown to a capture
    ///
    /// Ticks once per second, reporting each displayed value to `on_tick`.
    /// Teardown stops the countdown, or drops an in-flight capture before it
    /// registers anything.
    pub async fn run_countdown(
        &mut self,
        mut on_tick: impl FnMut(u32),
    ) -> AppResult<CapturedPhoto> {
        let period = crate::constants::countdown::TICK;
        let mut ticker = interval_at(Instant::now() + period, period);
        let mut teardown = self.teardown_rx.clone();

        if let Some(remaining) = self.orchestrator.remaining() {
            on_tick(remaining);
        }

        loop {
            tokio::select! {
                _ = torn_down(&mut teardown) => {
                    self.teardown();
                    return Err(SessionError::TornDown.into());
                }
                _ = ticker.tick() => match self.orchestrator.tick() {
                    TickOutcome::Continue { remaining } => on_tick(remaining),
                    TickOutcome::Capture => break,
                    TickOutcome::Ignored => return Err(SessionError::NoCountdown.into()),
                },
            }
        }

        let frame = match PhotoCapture::capture_from_stream(&self.camera) {
            Ok(frame) => frame,
            Err(e) => {
                self.orchestrator.capture_failed();
                self.events.error(format!("Capture failed: {}", e));
                return Err(e.into());
            }
        };
        let orientation = self.config.viewport.orientation();

        let result = tokio::select! {
            _ = torn_down(&mut teardown) => None,
            result = self.pipeline.capture(frame, orientation) => Some(result),
        };

        match result {
            None => {
                self.teardown();
                Err(SessionError::TornDown.into())
            }
            Some(Ok(photo)) => {
                if let Err(e) = self.orchestrator.finish_capture(photo.id) {
                    // Session ended underneath the capture
                    self.discard(&photo.id);
                    return Err(e.into());
                }
                Ok(photo)
            }
            Some(Err(e)) => {
                self.orchestrator.capture_failed();
                self.events.error(format!("Capture failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Discard the photo on display and return to Idle
    pub fn retake(&mut self) -> Result<PhotoId, SessionError> {
        let id = self.orchestrator.retake(&self.registry)?;
        self.events.publish(PhotoEvent::Discarded { id });
        Ok(id)
    }

    /// Abort the countdown, when enabled in the config
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.orchestrator.cancel()
    }

    /// Code payload for any photo id
    pub fn resolve_link(&self, id: &PhotoId) -> Result<CodePayload, LookupMiss> {
        self.resolver.resolve(id)
    }

    /// Code payload for the photo on display
    pub fn current_link(&self) -> AppResult<CodePayload> {
        let id = self
            .orchestrator
            .current_photo()
            .ok_or(AppError::Session(SessionError::NothingToRetake))?;
        Ok(self.resolver.resolve(&id)?)
    }

    /// Leave the page: stop the countdown, delete the photo, release the camera
    ///
    /// Idempotent.
    pub fn teardown(&mut self) {
        self.shutdown.trigger();
        if let Some(id) = self.orchestrator.teardown(&self.registry) {
            self.events.publish(PhotoEvent::Discarded { id });
        }
        self.camera.release();
    }

    fn discard(&self, id: &PhotoId) {
        if self.registry.delete(id).is_some() {
            warn!(%id, "Discarding photo finished after teardown");
            self.events.publish(PhotoEvent::Discarded { id: *id });
        }
    }
}

impl Drop for Booth {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Booth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Booth")
            .field("state", &self.orchestrator.state())
            .field("camera", &self.camera)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Resolves once teardown has been signalled
async fn torn_down(rx: &mut watch::Receiver<bool>) {
    // The sender lives as long as the booth
    let _ = rx.wait_for(|torn| *torn).await;
}

/// Log a one-line summary of a finished capture
pub fn log_capture(photo: &CapturedPhoto) {
    info!(
        id = %photo.id,
        width = photo.image.width(),
        height = photo.image.height(),
        orientation = ?photo.orientation,
        fallback = photo.watermark.is_fallback(),
        "Capture complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::still::StillImageBackend;
    use crate::backends::camera::types::CameraFrame;

    fn booth(seconds: u32) -> Booth {
        let frame = CameraFrame::from_rgba(24, 16, vec![128; 24 * 16 * 4]);
        let camera = CameraStreamManager::new(Box::new(StillImageBackend::from_frame(frame)));
        let mut config = Config {
            countdown_seconds: seconds,
            ..Config::default()
        };
        config.watermark.path = "/nonexistent/selfie-kiosk/watermark.png".into();
        Booth::new(config, camera, PhotoRegistry::new(), EventBus::default())
    }

    #[test]
    fn test_countdown_needs_camera() {
        let mut booth = booth(3);
        assert_eq!(booth.start_countdown(), Err(SessionError::CameraUnavailable));
        booth.mount().unwrap();
        assert_eq!(booth.start_countdown(), Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_reports_every_value() {
        let mut booth = booth(3);
        booth.mount().unwrap();
        booth.start_countdown().unwrap();

        let mut shown = Vec::new();
        let photo = booth.run_countdown(|n| shown.push(n)).await.unwrap();
        assert_eq!(shown, vec![3, 2, 1]);
        assert_eq!(booth.state(), CaptureState::Captured { photo_id: photo.id });
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_handle_releases_camera() {
        let mut booth = booth(10);
        booth.mount().unwrap();
        booth.start_countdown().unwrap();

        let handle = booth.teardown_handle();
        let observer = handle.clone();
        assert!(!observer.is_triggered());
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(4500)).await;
            handle.trigger();
        });

        let result = booth.run_countdown(|_| {}).await;
        assert!(matches!(result, Err(AppError::Session(SessionError::TornDown))));
        assert!(!booth.camera().is_attached());
        assert!(booth.registry().is_empty());
        assert!(observer.is_triggered());
        trigger.await.unwrap();
    }
}
