// SPDX-License-Identifier: GPL-3.0-only

//! Frame compositing
//!
//! Draws one camera frame onto an offscreen surface, correcting for the
//! kiosk orientation, then overlays the watermark or the fallback label.
//!
//! ```text
//! frame (RGBA) ──▶ surface ──▶ + watermark (0.7 alpha) ──▶ finished surface
//!                 (rotated      or
//!                  if portrait) + fallback label
//! ```
//!
//! Transforms are built per draw call and never stored on the surface, so
//! the frame rotation cannot leak into the watermark and nothing leaks into
//! encoding.

use super::watermark::Watermark;
use crate::backends::camera::CameraFrame;
use crate::constants::watermark as wm_consts;
use crate::errors::{AssetLoadError, PhotoError};
use resvg::tiny_skia::{BlendMode, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Orientation of the kiosk display at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Size of the kiosk display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Portrait when taller than wide
    pub fn orientation(&self) -> Orientation {
        if self.height > self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(
            crate::constants::camera::PREFERRED_WIDTH,
            crate::constants::camera::PREFERRED_HEIGHT,
        )
    }
}

/// Surface dimensions for a frame of `width`×`height`
///
/// Portrait swaps the axes: the sensor delivers landscape frames that are
/// rotated for the portrait display.
pub fn surface_size(width: u32, height: u32, orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Portrait => (height, width),
        Orientation::Landscape => (width, height),
    }
}

/// Where the scaled watermark sits on the surface (before rotation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl WatermarkPlacement {
    /// Scale to the surface preserving aspect ratio, then center
    ///
    /// Fits by width first; if that makes it taller than the surface, fits by
    /// height instead and recomputes the width.
    pub fn fit(surface_width: u32, surface_height: u32, mark_width: u32, mark_height: u32) -> Self {
        let (sw, sh) = (surface_width as f32, surface_height as f32);
        let (mw, mh) = (mark_width.max(1) as f32, mark_height.max(1) as f32);

        let mut width = sw;
        let mut height = mh / mw * width;
        if height > sh {
            height = sh;
            width = (mw / mh * height).min(sw);
        }

        Self {
            x: (sw - width) / 2.0,
            y: (sh - height) / 2.0,
            width,
            height,
        }
    }

    /// Full draw transform for a watermark of `mark_width`×`mark_height`
    /// on a `surface_width`×`surface_height` surface
    ///
    /// Rotate the surface 180° about its center, then rotate the watermark
    /// a further -90° about its own center.
    pub fn transform(
        &self,
        surface_width: u32,
        surface_height: u32,
        mark_width: u32,
        mark_height: u32,
    ) -> Transform {
        surface_rotation(surface_width, surface_height)
            .pre_translate(self.x + self.width / 2.0, self.y + self.height / 2.0)
            .pre_rotate(wm_consts::WATERMARK_ROTATION_DEG)
            .pre_translate(-self.width / 2.0, -self.height / 2.0)
            .pre_scale(
                self.width / mark_width.max(1) as f32,
                self.height / mark_height.max(1) as f32,
            )
    }
}

/// 180° rotation about the surface center
fn surface_rotation(surface_width: u32, surface_height: u32) -> Transform {
    let cx = surface_width as f32 / 2.0;
    let cy = surface_height as f32 / 2.0;
    Transform::from_translate(cx, cy)
        .pre_rotate(wm_consts::SURFACE_ROTATION_DEG)
        .pre_translate(-cx, -cy)
}

/// Which overlay ended up on the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkKind {
    /// The watermark asset
    Image,
    /// The text label, because the asset failed to load
    Fallback(AssetLoadError),
}

impl WatermarkKind {
    pub fn is_fallback(&self) -> bool {
        matches!(self, WatermarkKind::Fallback(_))
    }
}

/// Composited surface, ready for encoding
pub struct Composite {
    pub surface: Pixmap,
    pub watermark: WatermarkKind,
    pub orientation: Orientation,
}

impl std::fmt::Debug for Composite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composite")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("watermark", &self.watermark)
            .field("orientation", &self.orientation)
            .finish()
    }
}

/// Frame compositor
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    opacity: f32,
    fallback_label: Arc<str>,
}

impl FrameCompositor {
    pub fn new(opacity: f32, fallback_label: impl Into<Arc<str>>) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            fallback_label: fallback_label.into(),
        }
    }

    /// Draw the frame, then the watermark outcome
    pub fn compose(
        &self,
        frame: &CameraFrame,
        orientation: Orientation,
        watermark: &Result<Watermark, AssetLoadError>,
    ) -> Result<Composite, PhotoError> {
        let mut surface = self.draw_frame(frame, orientation)?;

        let kind = match watermark {
            Ok(mark) => {
                self.draw_watermark(&mut surface, mark);
                WatermarkKind::Image
            }
            Err(e) => {
                self.draw_fallback_label(&mut surface)?;
                WatermarkKind::Fallback(e.clone())
            }
        };

        info!(
            width = surface.width(),
            height = surface.height(),
            ?orientation,
            fallback = kind.is_fallback(),
            "Frame composited"
        );

        Ok(Composite {
            surface,
            watermark: kind,
            orientation,
        })
    }

    /// Allocate the surface and draw the frame with orientation correction
    pub fn draw_frame(
        &self,
        frame: &CameraFrame,
        orientation: Orientation,
    ) -> Result<Pixmap, PhotoError> {
        let rgba = frame.to_rgba().map_err(PhotoError::InvalidFrame)?;
        let size = IntSize::from_wh(frame.width, frame.height)
            .ok_or_else(|| PhotoError::InvalidFrame("zero-sized frame".to_string()))?;
        // Opaque pixels are already premultiplied
        let source = Pixmap::from_vec(rgba, size).ok_or_else(|| {
            PhotoError::CompositingFailed("frame does not fit a pixmap".to_string())
        })?;

        let (width, height) = surface_size(frame.width, frame.height, orientation);
        let mut surface = Pixmap::new(width, height).ok_or_else(|| {
            PhotoError::CompositingFailed(format!("cannot allocate {}x{} surface", width, height))
        })?;

        let transform = match orientation {
            Orientation::Portrait => Transform::from_translate(width as f32, 0.0).pre_rotate(90.0),
            Orientation::Landscape => Transform::identity(),
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        surface.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

        debug!(
            frame_width = frame.width,
            frame_height = frame.height,
            width,
            height,
            ?orientation,
            "Frame drawn"
        );
        Ok(surface)
    }

    /// Draw the image watermark at reduced opacity
    pub fn draw_watermark(&self, surface: &mut Pixmap, mark: &Watermark) {
        let (sw, sh) = (surface.width(), surface.height());
        let placement = WatermarkPlacement::fit(sw, sh, mark.width(), mark.height());
        let transform = placement.transform(sw, sh, mark.width(), mark.height());

        let paint = PixmapPaint {
            opacity: self.opacity,
            blend_mode: BlendMode::SourceOver,
            quality: FilterQuality::Bilinear,
        };
        surface.draw_pixmap(0, 0, mark.pixmap().as_ref(), &paint, transform, None);

        debug!(?placement, opacity = self.opacity, "Watermark drawn");
    }

    /// Draw the fallback label, white at reduced alpha, centered and rotated
    ///
    /// Hosts without any font get a plain band of the same size instead, so
    /// the photo always carries a mark.
    pub fn draw_fallback_label(&self, surface: &mut Pixmap) -> Result<(), PhotoError> {
        let fonts = font_database();
        let mark = if fonts.is_empty() {
            warn!("No system fonts found, drawing the fallback band");
            LabelMark::Band
        } else {
            LabelMark::Text
        };

        let svg = fallback_label_svg(surface.width(), surface.height(), &self.fallback_label, mark);
        let options = usvg::Options {
            fontdb: fonts,
            font_resolver: label_font_resolver(),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| PhotoError::CompositingFailed(format!("fallback label: {}", e)))?;

        resvg::render(&tree, Transform::identity(), &mut surface.as_mut());
        debug!(label = %self.fallback_label, ?mark, "Fallback label drawn");
        Ok(())
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new(wm_consts::OPACITY, wm_consts::FALLBACK_LABEL)
    }
}

/// How the fallback label is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelMark {
    Text,
    Band,
}

/// System fonts, loaded once per process
///
/// The generic sans-serif family points at Arial unless told otherwise; when
/// that face is missing it is remapped to the first installed family.
fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();

            let sans = db.query(&usvg::fontdb::Query {
                families: &[usvg::fontdb::Family::SansSerif],
                weight: usvg::fontdb::Weight::NORMAL,
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            });
            if sans.is_none() {
                let first = db
                    .faces()
                    .next()
                    .and_then(|face| face.families.first())
                    .map(|(name, _)| name.clone());
                if let Some(name) = first {
                    debug!(family = %name, "Using installed family as sans-serif");
                    db.set_sans_serif_family(name);
                }
            }

            debug!(faces = db.len(), "Loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

/// Font selection that settles for any loaded face rather than dropping text
fn label_font_resolver() -> usvg::FontResolver<'static> {
    let select = usvg::FontResolver::default_font_selector();
    usvg::FontResolver {
        select_font: Box::new(move |font, fontdb| {
            select(font, fontdb).or_else(|| fontdb.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

/// SVG document drawing the label over a transparent `width`×`height` canvas
fn fallback_label_svg(width: u32, height: u32, label: &str, mark: LabelMark) -> String {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let size = wm_consts::FALLBACK_FONT_SIZE;

    let body = match mark {
        LabelMark::Text => format!(
            r##"<text x="0" y="0" font-family="{family}" font-size="{size}" fill="#ffffff" fill-opacity="{alpha}" text-anchor="middle" dominant-baseline="central">{text}</text>"##,
            family = wm_consts::FALLBACK_FONT_FAMILY,
            size = size,
            alpha = wm_consts::FALLBACK_ALPHA,
            text = escape_xml(label),
        ),
        LabelMark::Band => {
            let band_width = size * 0.6 * label.chars().count().max(1) as f32;
            format!(
                r##"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="#ffffff" fill-opacity="{alpha}"/>"##,
                x = -band_width / 2.0,
                y = -size / 2.0,
                w = band_width,
                h = size,
                alpha = wm_consts::FALLBACK_ALPHA,
            )
        }
    };

    format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
            r##"<g transform="translate({cx} {cy}) rotate({surface}) translate({ncx} {ncy}) translate({cx} {cy}) rotate({label_rot})">"##,
            "{body}",
            "</g></svg>"
        ),
        w = width,
        h = height,
        cx = cx,
        cy = cy,
        ncx = -cx,
        ncy = -cy,
        surface = wm_consts::SURFACE_ROTATION_DEG,
        label_rot = wm_consts::WATERMARK_ROTATION_DEG,
        body = body,
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
