// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for photo capture
//!
//! Heavy work (decoding, compositing, encoding) runs on the blocking pool so
//! the countdown and the camera stream keep going.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ JPEG data URI│
//! │   (RGBA)     │     │  - Rotation       │     │  + PhotoId   │
//! │              │     │  - Watermark      │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Capture, compositing and JPEG encoding

pub mod photo;
