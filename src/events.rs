// SPDX-License-Identifier: GPL-3.0-only

//! Event bus
//!
//! The capture core publishes [`PhotoEvent`]s and never calls collaborators
//! directly; the uploader and any UI listen on their own receivers.
//! User-facing messages travel as [`Notification`]s on a second channel.

use crate::storage::{ImageData, PhotoId};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 16;

/// Photo lifecycle events
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoEvent {
    /// A photo was finalized and registered
    Captured { id: PhotoId, image: ImageData },
    /// A photo was removed from the registry (retake or teardown)
    Discarded { id: PhotoId },
}

impl PhotoEvent {
    pub fn id(&self) -> PhotoId {
        match self {
            PhotoEvent::Captured { id, .. } | PhotoEvent::Discarded { id } => *id,
        }
    }
}

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Sending side of the notification channel
///
/// Holding one does not keep the photo channel open, so collaborators that
/// only report problems can outlive the capture page cleanly.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    /// Publish a notification, mirroring it to the log
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Info => info!(%message, "Notification"),
            NotificationLevel::Warning => warn!(%message, "Notification"),
            NotificationLevel::Error => error!(%message, "Notification"),
        }
        let _ = self.tx.send(Notification { level, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }
}

/// Broadcast channels for photo events and notifications
///
/// Cloning shares the channels. Publishing with no subscribers is not an
/// error.
#[derive(Debug, Clone)]
pub struct EventBus {
    photos: broadcast::Sender<PhotoEvent>,
    notifier: Notifier,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (photos, _) = broadcast::channel(capacity.max(1));
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            photos,
            notifier: Notifier { tx },
        }
    }

    /// Notification handle that does not hold the photo channel open
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub fn subscribe_photos(&self) -> broadcast::Receiver<PhotoEvent> {
        self.photos.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.tx.subscribe()
    }

    /// Publish a photo event
    pub fn publish(&self, event: PhotoEvent) {
        let receivers = self.photos.send(event.clone()).unwrap_or(0);
        debug!(id = %event.id(), receivers, "Published photo event");
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.notifier.notify(level, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notifier.info(message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notifier.warning(message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notifier.error(message);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(PhotoEvent::Discarded { id: PhotoId::new() });
        bus.warning("nobody listening");
    }

    #[tokio::test]
    async fn test_subscribers_see_events() {
        let bus = EventBus::default();
        let mut photos = bus.subscribe_photos();
        let mut notes = bus.clone().subscribe_notifications();

        let id = PhotoId::new();
        bus.publish(PhotoEvent::Discarded { id });
        bus.error("upload failed");

        assert_eq!(photos.recv().await.unwrap(), PhotoEvent::Discarded { id });
        let note = notes.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "upload failed");
    }

    #[tokio::test]
    async fn test_notifier_does_not_hold_photo_channel() {
        let bus = EventBus::default();
        let mut photos = bus.subscribe_photos();
        let mut notes = bus.subscribe_notifications();
        let notifier = bus.notifier();
        drop(bus);

        assert!(matches!(
            photos.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        notifier.info("still reachable");
        assert_eq!(notes.recv().await.unwrap().message, "still reachable");
    }
}
