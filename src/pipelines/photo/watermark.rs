// SPDX-License-Identifier: GPL-3.0-only

//! Watermark asset loading
//!
//! The asset is loaded fresh for every capture and awaited before
//! compositing starts. Any failure is reported as an [`AssetLoadError`] so
//! the compositor can draw the text fallback instead.

use crate::errors::AssetLoadError;
use image::RgbaImage;
use resvg::tiny_skia::{IntSize, Pixmap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Where the watermark comes from
#[derive(Debug, Clone)]
pub enum WatermarkSource {
    /// Image file on disk
    File(PathBuf),
    /// Encoded image bytes already in memory
    Memory(Arc<[u8]>),
    /// No watermark configured
    None,
}

impl WatermarkSource {
    /// Short description for logs and errors
    pub fn name(&self) -> String {
        match self {
            WatermarkSource::File(path) => path.display().to_string(),
            WatermarkSource::Memory(bytes) => format!("<{} bytes in memory>", bytes.len()),
            WatermarkSource::None => "<none>".to_string(),
        }
    }

    /// Load and decode the watermark
    pub async fn load(&self) -> Result<Watermark, AssetLoadError> {
        let name = self.name();
        let fail = |reason: String| AssetLoadError {
            source_name: name.clone(),
            reason,
        };

        let bytes: Arc<[u8]> = match self {
            WatermarkSource::File(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|e| fail(e.to_string()))?,
            WatermarkSource::Memory(bytes) => bytes.clone(),
            WatermarkSource::None => return Err(fail("no watermark configured".to_string())),
        };

        // Decoding is CPU-bound
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| fail(format!("decode task error: {}", e)))?
            .map_err(|e| fail(e.to_string()))?;

        let watermark = Watermark::from_rgba_image(&decoded.to_rgba8()).map_err(fail)?;
        debug!(
            source = %name,
            width = watermark.width(),
            height = watermark.height(),
            "Watermark loaded"
        );
        Ok(watermark)
    }
}

/// Decoded watermark, premultiplied and ready to draw
#[derive(Clone)]
pub struct Watermark {
    pixmap: Pixmap,
}

impl Watermark {
    pub fn from_rgba_image(image: &RgbaImage) -> Result<Self, String> {
        let size = IntSize::from_wh(image.width(), image.height())
            .ok_or_else(|| "watermark has no pixels".to_string())?;

        let mut data = image.as_raw().clone();
        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a < 255 {
                px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
                px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
                px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
            }
        }

        let pixmap = Pixmap::from_vec(data, size)
            .ok_or_else(|| "watermark does not fit a pixmap".to_string())?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

impl std::fmt::Debug for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watermark")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Arc<[u8]> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba(pixel));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        Arc::from(buffer)
    }

    #[tokio::test]
    async fn test_load_from_memory() {
        let source = WatermarkSource::Memory(png_bytes(6, 3, [10, 20, 30, 255]));
        let mark = source.load().await.unwrap();
        assert_eq!((mark.width(), mark.height()), (6, 3));
    }

    #[tokio::test]
    async fn test_missing_file_is_asset_error() {
        let source = WatermarkSource::File(PathBuf::from("/nonexistent/selfie-kiosk/udb.png"));
        let err = source.load().await.unwrap_err();
        assert!(err.source_name.contains("udb.png"));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_asset_error() {
        let source = WatermarkSource::Memory(Arc::from(&b"not an image"[..]));
        assert!(source.load().await.is_err());
    }

    #[tokio::test]
    async fn test_none_is_asset_error() {
        assert!(WatermarkSource::None.load().await.is_err());
    }

    #[test]
    fn test_premultiplies_alpha() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 128]));
        let mark = Watermark::from_rgba_image(&img).unwrap();
        let px = mark.pixmap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
    }
}
