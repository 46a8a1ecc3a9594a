// SPDX-License-Identifier: GPL-3.0-only

//! Async photo capture pipeline
//!
//! ```text
//! Camera stream → Capture → Watermark load → Composite → Encode → Registry
//!       ↓                                                            ↓
//! Stream keeps running                                     PhotoEvent::Captured
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: Snapshot the current frame of the mounted stream
//! 2. **Watermark**: Load the asset; failure selects the text fallback
//! 3. **Composite**: Orientation-corrected draw plus overlay (blocking task)
//! 4. **Encode**: JPEG data URI (same blocking task)
//! 5. **Register**: Store under a fresh [`PhotoId`] and publish the event
//!
//! A photo becomes observable only after step 5 completes; a pipeline future
//! dropped mid-way leaves nothing behind.

pub mod capture;
pub mod compositor;
pub mod encoding;
pub mod watermark;

pub use capture::PhotoCapture;
pub use compositor::{
    FrameCompositor, Orientation, Viewport, WatermarkKind, WatermarkPlacement, surface_size,
};
pub use encoding::{EncodedImage, EncodingFormat, PhotoEncoder};
pub use watermark::{Watermark, WatermarkSource};

use crate::backends::camera::types::CameraFrame;
use crate::config::Config;
use crate::events::{EventBus, PhotoEvent};
use crate::errors::PhotoError;
use crate::storage::{ImageData, PhotoId, PhotoRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// A finished, registered photo
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub id: PhotoId,
    pub image: ImageData,
    pub watermark: WatermarkKind,
    pub orientation: Orientation,
}

/// Finished image before registration
#[derive(Debug, Clone)]
pub struct RenderedPhoto {
    pub encoded: EncodedImage,
    pub watermark: WatermarkKind,
    pub orientation: Orientation,
}

/// Complete photo capture pipeline
///
/// Orchestrates the watermark → composite → encode → register workflow.
#[derive(Debug, Clone)]
pub struct PhotoPipeline {
    compositor: FrameCompositor,
    encoder: PhotoEncoder,
    watermark: WatermarkSource,
    registry: PhotoRegistry,
    events: EventBus,
}

impl PhotoPipeline {
    pub fn new(
        compositor: FrameCompositor,
        encoder: PhotoEncoder,
        watermark: WatermarkSource,
        registry: PhotoRegistry,
        events: EventBus,
    ) -> Self {
        Self {
            compositor,
            encoder,
            watermark,
            registry,
            events,
        }
    }

    /// Pipeline configured from the kiosk settings
    pub fn from_config(config: &Config, registry: PhotoRegistry, events: EventBus) -> Self {
        Self::new(
            FrameCompositor::new(
                config.watermark.opacity,
                config.watermark.fallback_label.as_str(),
            ),
            PhotoEncoder::with_quality(config.jpeg_quality),
            WatermarkSource::File(config.watermark.path.clone()),
            registry,
            events,
        )
    }

    pub fn registry(&self) -> &PhotoRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Composite and encode a frame without registering it
    pub async fn render(
        &self,
        frame: Arc<CameraFrame>,
        orientation: Orientation,
    ) -> Result<RenderedPhoto, PhotoError> {
        frame.validate().map_err(PhotoError::InvalidFrame)?;

        let watermark = self.watermark.load().await;
        if let Err(e) = &watermark {
            warn!(error = %e, "Watermark unavailable, using text label");
        }

        let compositor = self.compositor.clone();
        let encoder = self.encoder;

        // Compositing and encoding are CPU-bound
        tokio::task::spawn_blocking(move || {
            let composite = compositor.compose(&frame, orientation, &watermark)?;
            let encoded = encoder.encode(&composite.surface)?;
            Ok::<_, PhotoError>(RenderedPhoto {
                encoded,
                watermark: composite.watermark,
                orientation,
            })
        })
        .await
        .map_err(|e| PhotoError::CompositingFailed(format!("Compositing task error: {}", e)))?
    }

    /// Run the full pipeline and register the result
    pub async fn capture(
        &self,
        frame: Arc<CameraFrame>,
        orientation: Orientation,
    ) -> Result<CapturedPhoto, PhotoError> {
        let rendered = self.render(frame, orientation).await?;
        let image = rendered.encoded.to_image_data();
        let id = PhotoId::new();

        self.registry.put(id, image.clone());
        info!(
            %id,
            width = image.width(),
            height = image.height(),
            fallback = rendered.watermark.is_fallback(),
            "Photo registered"
        );

        if let WatermarkKind::Fallback(e) = &rendered.watermark {
            self.events
                .warning(format!("Watermark unavailable, used text label ({})", e.reason));
        }
        self.events.publish(PhotoEvent::Captured {
            id,
            image: image.clone(),
        });

        Ok(CapturedPhoto {
            id,
            image,
            watermark: rendered.watermark,
            orientation,
        })
    }
}
