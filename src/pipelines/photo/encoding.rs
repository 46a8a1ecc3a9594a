// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! Flattens the composited surface and encodes it:
//! - JPEG (with quality control), the kiosk default
//! - PNG (lossless)
//!
//! The encoded bytes become the data URI stored in the registry.

use crate::constants::EncodingQuality;
use crate::errors::PhotoError;
use crate::storage::ImageData;
use image::RgbImage;
use resvg::tiny_skia::Pixmap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "image/jpeg",
            EncodingFormat::Png => "image/png",
        }
    }
}

/// Encoded image data
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Wrap as a data URI
    pub fn to_image_data(&self) -> ImageData {
        ImageData::from_encoded(&self.data, self.format.mime_type(), self.width, self.height)
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl PhotoEncoder {
    /// Create a new encoder with JPEG format and high quality
    pub fn new() -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            quality: EncodingQuality::High,
        }
    }

    pub fn with_quality(quality: EncodingQuality) -> Self {
        Self {
            quality,
            ..Self::new()
        }
    }

    /// Set encoding format
    pub fn set_format(&mut self, format: EncodingFormat) {
        self.format = format;
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    pub fn quality(&self) -> EncodingQuality {
        self.quality
    }

    /// Encode a finished surface
    ///
    /// Blocking; callers on the runtime go through `spawn_blocking`.
    pub fn encode(&self, surface: &Pixmap) -> Result<EncodedImage, PhotoError> {
        let (width, height) = (surface.width(), surface.height());
        let image = flatten(surface)?;

        let data = match self.format {
            EncodingFormat::Jpeg => Self::encode_jpeg(image, self.quality)?,
            EncodingFormat::Png => Self::encode_png(image)?,
        };

        debug!(size = data.len(), format = ?self.format, "Encoding complete");
        Ok(EncodedImage {
            data,
            format: self.format,
            width,
            height,
        })
    }

    /// Save encoded image to disk
    ///
    /// Generates a timestamped filename inside `output_dir`.
    pub async fn save(encoded: &EncodedImage, output_dir: &Path) -> Result<PathBuf, PhotoError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("IMG_{}.{}", timestamp, encoded.format.extension());
        let filepath = output_dir.join(&filename);

        info!(path = %filepath.display(), "Saving photo");
        tokio::fs::create_dir_all(output_dir).await?;
        tokio::fs::write(&filepath, &encoded.data).await?;

        info!(path = %filepath.display(), "Photo saved successfully");
        Ok(filepath)
    }

    /// Encode image as JPEG
    fn encode_jpeg(image: RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }

    /// Encode image as PNG
    fn encode_png(image: RgbImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();

        image
            .write_to(
                &mut std::io::Cursor::new(&mut buffer),
                image::ImageFormat::Png,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("PNG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop alpha from a premultiplied surface
fn flatten(surface: &Pixmap) -> Result<RgbImage, PhotoError> {
    let mut rgb = Vec::with_capacity(surface.width() as usize * surface.height() as usize * 3);
    for px in surface.pixels() {
        let c = px.demultiply();
        rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
    }
    RgbImage::from_raw(surface.width(), surface.height(), rgb)
        .ok_or_else(|| PhotoError::EncodingFailed("surface size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resvg::tiny_skia::Color;

    fn surface(width: u32, height: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(Color::from_rgba8(200, 40, 40, 255));
        pixmap
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
        assert_eq!(EncodingFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_jpeg_output_is_decodable() {
        let encoded = PhotoEncoder::new().encode(&surface(16, 24)).unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 24));
    }

    #[test]
    fn test_data_uri_is_jpeg() {
        let encoded = PhotoEncoder::new().encode(&surface(8, 8)).unwrap();
        let image = encoded.to_image_data();
        assert!(image.as_data_uri().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.decode_bytes(), Some(encoded.data));
    }

    #[test]
    fn test_png_is_lossless() {
        let mut encoder = PhotoEncoder::new();
        encoder.set_format(EncodingFormat::Png);
        let encoded = encoder.encode(&surface(3, 3)).unwrap();

        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(1, 1).0, [200, 40, 40]);
    }

    #[tokio::test]
    async fn test_save_uses_timestamped_name() {
        let dir = std::env::temp_dir().join(format!("selfie-kiosk-save-{}", uuid::Uuid::new_v4()));
        let encoded = PhotoEncoder::new().encode(&surface(4, 4)).unwrap();

        let path = PhotoEncoder::save(&encoded, &dir).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("IMG_") && name.ends_with(".jpg"), "{name}");
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
