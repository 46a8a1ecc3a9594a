// SPDX-License-Identifier: GPL-3.0-only

//! Ephemeral photo storage
//!
//! [`PhotoRegistry`] is the system of record for finished photos while the
//! process runs. [`LastImageCache`] keeps a copy of the most recent image on
//! disk only so a failed upload can be retried by hand.

use crate::constants;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque unique photo identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(Uuid);

impl PhotoId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PhotoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhotoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Finished, encoded image
///
/// The data URI is shared, never mutated: everything that reads a photo
/// (link resolver, uploader, local cache) sees the same finalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    data_uri: Arc<str>,
    width: u32,
    height: u32,
}

impl ImageData {
    /// Wrap encoded bytes as a base64 data URI
    pub fn from_encoded(bytes: &[u8], mime_type: &str, width: u32, height: u32) -> Self {
        let data_uri = format!("data:{};base64,{}", mime_type, BASE64.encode(bytes));
        Self {
            data_uri: Arc::from(data_uri),
            width,
            height,
        }
    }

    /// The data URI (`data:image/jpeg;base64,...`)
    pub fn as_data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// MIME type declared in the data URI
    pub fn mime_type(&self) -> Option<&str> {
        self.data_uri
            .strip_prefix("data:")?
            .split_once(';')
            .map(|(mime, _)| mime)
    }

    /// Decode the payload back into raw encoded bytes
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.data_uri.split_once(";base64,")?;
        BASE64.decode(payload).ok()
    }

    /// Length of the data URI in bytes
    pub fn len(&self) -> usize {
        self.data_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_uri.is_empty()
    }
}

/// Process-local photo store
///
/// Cheap to clone; all clones share one map. Each operation takes the lock
/// once, so it is atomic with respect to a given id. There is no capacity
/// bound: the capture session deletes its photo on retake and teardown.
#[derive(Clone, Default)]
pub struct PhotoRegistry {
    inner: Arc<Mutex<HashMap<PhotoId, ImageData>>>,
}

impl PhotoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PhotoId, ImageData>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an image, returning the value it replaced
    pub fn put(&self, id: PhotoId, image: ImageData) -> Option<ImageData> {
        debug!(%id, size = image.len(), "Registering photo");
        self.lock().insert(id, image)
    }

    /// Look an image up
    pub fn get(&self, id: &PhotoId) -> Option<ImageData> {
        self.lock().get(id).cloned()
    }

    /// Remove an image, returning it
    pub fn delete(&self, id: &PhotoId) -> Option<ImageData> {
        let removed = self.lock().remove(id);
        debug!(%id, removed = removed.is_some(), "Deleting photo");
        removed
    }

    pub fn contains(&self, id: &PhotoId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every photo (process shutdown)
    pub fn clear(&self) {
        let mut map = self.lock();
        if !map.is_empty() {
            info!(count = map.len(), "Clearing photo registry");
            map.clear();
        }
    }
}

impl std::fmt::Debug for PhotoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoRegistry")
            .field("photos", &self.len())
            .finish()
    }
}

/// Most recent finished image as persisted on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedImage {
    pub id: PhotoId,
    /// Data URI
    pub image: String,
}

/// Single-slot store for the most recent finished image
#[derive(Debug, Clone)]
pub struct LastImageCache {
    path: PathBuf,
}

impl LastImageCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache in the user cache directory
    pub fn in_cache_dir() -> Option<Self> {
        dirs::cache_dir().map(|dir| {
            Self::new(
                dir.join(constants::paths::APP_DIR)
                    .join(constants::upload::CACHE_FILE),
            )
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the cached image
    pub async fn store(&self, id: PhotoId, image: &ImageData) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let entry = CachedImage {
            id,
            image: image.as_data_uri().to_string(),
        };
        let text = serde_json::to_string(&entry)?;
        tokio::fs::write(&self.path, text).await?;
        debug!(%id, path = %self.path.display(), "Cached last image");
        Ok(())
    }

    /// Read the cached image; a missing or unreadable file is an empty cache
    pub async fn load(&self) -> Option<CachedImage> {
        let text = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<CachedImage>(&text) {
            Ok(entry) if !entry.image.is_empty() => Some(entry),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "Ignoring unreadable image cache");
                None
            }
        }
    }

    /// Forget the cached image
    pub async fn clear(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
