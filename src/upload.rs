// SPDX-License-Identifier: GPL-3.0-only

//! Upload collaborator
//!
//! Subscribes to [`PhotoEvent`]s and pushes each finished image to the
//! configured backend as `{"image": <data URI>, "filename": <name>}`.
//! Best effort: failures are logged and notified, never retried
//! automatically, and never touch the local photo or its link.

use crate::config::UploadSettings;
use crate::constants;
use crate::errors::UploadError;
use crate::events::{Notifier, PhotoEvent};
use crate::storage::{ImageData, LastImageCache, PhotoId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How uploaded files are named on the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UploadNaming {
    /// `{id}.jpg`, one file per photo
    #[default]
    PerPhoto,
    /// The same name for every upload; each upload replaces the last
    Fixed { filename: String },
}

impl UploadNaming {
    /// Fixed naming with the legacy single-kiosk filename
    pub fn legacy_fixed() -> Self {
        UploadNaming::Fixed {
            filename: constants::upload::FIXED_FILENAME.to_string(),
        }
    }

    pub fn filename_for(&self, id: &PhotoId) -> String {
        match self {
            UploadNaming::PerPhoto => format!("{}.jpg", id),
            UploadNaming::Fixed { filename } => filename.clone(),
        }
    }
}

/// Request body
#[derive(Debug, Serialize)]
pub struct UploadRequest<'a> {
    pub image: &'a str,
    pub filename: &'a str,
}

/// HTTP client for the upload backend
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
    naming: UploadNaming,
}

impl UploadClient {
    pub fn new(
        endpoint: impl Into<String>,
        naming: UploadNaming,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            naming,
        })
    }

    /// Client for the configured endpoint, `None` when uploads are disabled
    pub fn from_settings(settings: &UploadSettings) -> Result<Option<Self>, UploadError> {
        match &settings.endpoint {
            Some(endpoint) => Self::new(
                endpoint.clone(),
                settings.naming.clone(),
                Duration::from_secs(settings.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn naming(&self) -> &UploadNaming {
        &self.naming
    }

    /// POST one image and return the backend's JSON acknowledgment
    pub async fn upload(&self, image: &str, filename: &str) -> Result<serde_json::Value, UploadError> {
        debug!(endpoint = %self.endpoint, filename, size = image.len(), "Uploading image");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&UploadRequest { image, filename })
            .send()
            .await?
            .error_for_status()?;

        let ack = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        info!(filename, "Image uploaded");
        debug!(%ack, "Upload acknowledgment");
        Ok(ack)
    }

    /// Upload a registered photo under its policy filename
    pub async fn upload_photo(
        &self,
        id: &PhotoId,
        image: &ImageData,
    ) -> Result<serde_json::Value, UploadError> {
        let filename = self.naming.filename_for(id);
        self.upload(image.as_data_uri(), &filename).await
    }
}

/// Run the collaborator until the photo channel closes
///
/// Every captured photo is cached locally (when a cache is given) and then
/// uploaded (when a client is given).
pub fn spawn_uploader(
    client: Option<UploadClient>,
    cache: Option<LastImageCache>,
    mut photos: broadcast::Receiver<PhotoEvent>,
    notifier: Notifier,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match photos.recv().await {
                Ok(PhotoEvent::Captured { id, image }) => {
                    if let Some(cache) = &cache
                        && let Err(e) = cache.store(id, &image).await
                    {
                        warn!(error = %e, "Failed to cache last image");
                    }

                    if let Some(client) = &client
                        && let Err(e) = client.upload_photo(&id, &image).await
                    {
                        error!(%id, error = %e, "Error uploading image");
                        notifier.error("Failed to upload image");
                    }
                }
                Ok(PhotoEvent::Discarded { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Uploader lagged behind photo events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Photo event channel closed, uploader stopping");
                    break;
                }
            }
        }
    })
}

/// Upload the locally cached image again
pub async fn retry_last(
    client: &UploadClient,
    cache: &LastImageCache,
) -> Result<serde_json::Value, UploadError> {
    let entry = cache.load().await.ok_or(UploadError::NothingCached)?;
    let filename = client.naming().filename_for(&entry.id);
    info!(id = %entry.id, filename, "Retrying upload of cached image");
    client.upload(&entry.image, &filename).await
}
