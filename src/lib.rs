// SPDX-License-Identifier: GPL-3.0-only

//! Selfie Kiosk - photo booth capture pipeline
//!
//! A countdown fires the shutter, the frame is rotated for the kiosk display,
//! watermarked, encoded as a JPEG data URI and kept in a process-local
//! registry. Each finished photo resolves to a payload for a scannable code.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera backends and the stream manager
//! - [`session`]: Countdown state machine
//! - [`pipelines`]: Capture, compositing and encoding
//! - [`storage`]: Photo registry and the local last-image cache
//! - [`link`]: Code payloads for finished photos
//! - [`upload`]: Best-effort upload collaborator
//! - [`booth`]: The capture page tying it all together
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let registry = PhotoRegistry::new();
//! let events = EventBus::default();
//! let mut booth = Booth::from_config(Config::load()?, registry, events)?;
//! booth.mount()?;
//! booth.start_countdown()?;
//! let photo = booth.run_countdown(|n| println!("{n}")).await?;
//! let code = booth.resolve_link(&photo.id)?;
//! ```

pub mod backends;
pub mod booth;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod link;
pub mod pipelines;
pub mod session;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use booth::{Booth, TeardownHandle};
pub use config::Config;
pub use constants::EncodingQuality;
pub use errors::{AppError, AppResult};
pub use events::{EventBus, Notification, NotificationLevel, Notifier, PhotoEvent};
pub use link::{CodePayload, LinkPolicy, LinkResolver};
pub use storage::{ImageData, PhotoId, PhotoRegistry};
