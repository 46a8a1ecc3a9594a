// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture page
//!
//! Time is paused, so countdowns complete instantly and deterministically.

use selfie_kiosk::backends::camera::CameraStreamManager;
use selfie_kiosk::backends::camera::still::{StillImageBackend, StopCounter};
use selfie_kiosk::backends::camera::types::CameraFrame;
use selfie_kiosk::errors::SessionError;
use selfie_kiosk::pipelines::photo::WatermarkKind;
use selfie_kiosk::session::CaptureState;
use selfie_kiosk::{
    AppError, Booth, Config, EventBus, LinkPolicy, NotificationLevel, PhotoEvent, PhotoId,
    PhotoRegistry,
};
use std::path::PathBuf;
use std::time::Duration;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("selfie-kiosk-booth-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn landscape_frame() -> CameraFrame {
    CameraFrame::from_rgba(192, 108, vec![60; 192 * 108 * 4])
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.watermark.path = PathBuf::from("/nonexistent/selfie-kiosk/udb.png");
    config
}

fn booth_with(config: Config) -> (Booth, StopCounter) {
    let backend = StillImageBackend::from_frame(landscape_frame());
    let stops = backend.stop_counter();
    let booth = Booth::new(
        config,
        CameraStreamManager::new(Box::new(backend)),
        PhotoRegistry::new(),
        EventBus::default(),
    );
    (booth, stops)
}

#[tokio::test(start_paused = true)]
async fn test_ten_second_countdown_captures_once() {
    let (mut booth, _) = booth_with(test_config());
    let mut events = booth.events().subscribe_photos();
    booth.mount().unwrap();
    assert_eq!(booth.start_countdown(), Ok(10));

    let mut shown = Vec::new();
    let photo = booth.run_countdown(|n| shown.push(n)).await.unwrap();

    assert_eq!(shown, (1..=10).rev().collect::<Vec<_>>());
    assert_eq!(booth.state(), CaptureState::Captured { photo_id: photo.id });
    assert_eq!(booth.registry().len(), 1);

    match events.recv().await.unwrap() {
        PhotoEvent::Captured { id, .. } => assert_eq!(id, photo.id),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(events.try_recv().is_err(), "exactly one capture per countdown");
}

#[tokio::test(start_paused = true)]
async fn test_nine_seconds_is_not_enough() {
    let (mut booth, _) = booth_with(test_config());
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let result =
        tokio::time::timeout(Duration::from_millis(9500), booth.run_countdown(|_| {})).await;
    assert!(result.is_err(), "capture fired early");
    assert!(booth.registry().is_empty());
    assert_eq!(booth.state(), CaptureState::CountingDown { remaining: 1 });
}

#[tokio::test(start_paused = true)]
async fn test_portrait_viewport_rotates_landscape_frame() {
    let (mut booth, _) = booth_with(test_config());
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let photo = booth.run_countdown(|_| {}).await.unwrap();
    assert_eq!((photo.image.width(), photo.image.height()), (108, 192));

    let bytes = photo.image.decode_bytes().unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (108, 192));
}

#[tokio::test(start_paused = true)]
async fn test_landscape_viewport_keeps_dimensions() {
    let mut config = test_config();
    config.viewport.width = 1920;
    config.viewport.height = 1080;
    let (mut booth, _) = booth_with(config);
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let photo = booth.run_countdown(|_| {}).await.unwrap();
    assert_eq!((photo.image.width(), photo.image.height()), (192, 108));
}

#[tokio::test(start_paused = true)]
async fn test_missing_watermark_falls_back_with_notification() {
    let (mut booth, _) = booth_with(test_config());
    let mut notes = booth.events().subscribe_notifications();
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let photo = booth.run_countdown(|_| {}).await.unwrap();
    assert!(matches!(photo.watermark, WatermarkKind::Fallback(_)));
    assert!(!photo.image.is_empty());

    // The grey frame (60) picks up the light label somewhere
    let bytes = photo.image.decode_bytes().unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
    let marked = decoded.pixels().filter(|p| p.0.iter().all(|&c| c > 120)).count();
    assert!(marked > 20, "fallback label missing from the photo");

    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_watermark_file_is_used() {
    let dir = temp_dir();
    let path = dir.join("udb.png");
    image::RgbaImage::from_pixel(40, 10, image::Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();

    let mut config = test_config();
    config.watermark.path = path;
    let (mut booth, _) = booth_with(config);
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let photo = booth.run_countdown(|_| {}).await.unwrap();
    assert_eq!(photo.watermark, WatermarkKind::Image);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(start_paused = true)]
async fn test_retake_cycles_keep_registry_bounded() {
    let mut config = test_config();
    config.countdown_seconds = 2;
    let (mut booth, _) = booth_with(config);
    let mut events = booth.events().subscribe_photos();
    booth.mount().unwrap();

    let mut previous: Option<PhotoId> = None;
    for _ in 0..5 {
        booth.start_countdown().unwrap();
        let photo = booth.run_countdown(|_| {}).await.unwrap();
        assert_ne!(Some(photo.id), previous);
        assert_eq!(booth.registry().len(), 1);

        assert_eq!(booth.retake(), Ok(photo.id));
        assert!(booth.registry().is_empty());
        assert!(booth.resolve_link(&photo.id).is_err());
        assert_eq!(booth.state(), CaptureState::Idle);
        previous = Some(photo.id);
    }

    let mut captured = 0;
    let mut discarded = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            PhotoEvent::Captured { .. } => captured += 1,
            PhotoEvent::Discarded { .. } => discarded += 1,
        }
    }
    assert_eq!((captured, discarded), (5, 5));
}

#[tokio::test(start_paused = true)]
async fn test_link_resolves_current_photo() {
    let (mut booth, _) = booth_with(test_config());
    booth.mount().unwrap();
    booth.start_countdown().unwrap();
    let photo = booth.run_countdown(|_| {}).await.unwrap();

    let payload = booth.resolve_link(&photo.id).unwrap();
    assert_eq!(payload.value, photo.image.as_data_uri());
    assert_eq!(booth.current_link().unwrap(), payload);
}

#[tokio::test(start_paused = true)]
async fn test_remote_link_is_per_photo() {
    let mut config = test_config();
    config.link.policy = LinkPolicy::Remote {
        public_base: "https://kiosk.example.org".to_string(),
    };
    let (mut booth, _) = booth_with(config);
    booth.mount().unwrap();
    booth.start_countdown().unwrap();
    let photo = booth.run_countdown(|_| {}).await.unwrap();

    let payload = booth.resolve_link(&photo.id).unwrap();
    assert_eq!(
        payload.value,
        format!("https://kiosk.example.org/image/{}.jpg", photo.id)
    );
}

#[test]
fn test_unknown_id_is_not_found() {
    let (booth, _) = booth_with(test_config());
    let err = booth.resolve_link(&PhotoId::new()).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_releases_camera_and_deletes_photo() {
    let (mut booth, stops) = booth_with(test_config());
    let mut events = booth.events().subscribe_photos();
    booth.mount().unwrap();
    booth.start_countdown().unwrap();
    let photo = booth.run_countdown(|_| {}).await.unwrap();

    booth.teardown();
    assert_eq!(stops.count(), 1);
    assert!(!booth.camera().is_attached());
    assert!(booth.registry().is_empty());
    assert_eq!(booth.start_countdown(), Err(SessionError::TornDown));

    // Second teardown is a no-op
    booth.teardown();
    assert_eq!(stops.count(), 1);

    let _captured = events.recv().await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        PhotoEvent::Discarded { id: photo.id }
    );
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_countdown_stops_capture() {
    let (mut booth, stops) = booth_with(test_config());
    booth.mount().unwrap();
    booth.start_countdown().unwrap();

    let handle = booth.teardown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.trigger();
    });

    let result = booth.run_countdown(|_| {}).await;
    assert!(matches!(result, Err(AppError::Session(SessionError::TornDown))));
    assert_eq!(stops.count(), 1);
    assert!(booth.registry().is_empty());

    // Nothing fires later either
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(booth.registry().is_empty());
}

#[test]
fn test_drop_releases_camera() {
    let (mut booth, stops) = booth_with(test_config());
    booth.mount().unwrap();
    drop(booth);
    assert_eq!(stops.count(), 1);
}

#[tokio::test]
async fn test_acquisition_failure_is_notified() {
    let mut config = test_config();
    config.camera.source_path = Some(PathBuf::from("/nonexistent/selfie-kiosk/feed.png"));
    let registry = PhotoRegistry::new();
    let events = EventBus::default();
    let mut notes = events.subscribe_notifications();

    let mut booth = Booth::from_config(config, registry, events).unwrap();
    assert!(booth.mount().is_err());
    assert_eq!(booth.start_countdown(), Err(SessionError::CameraUnavailable));

    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
}

#[test]
fn test_still_backend_requires_source() {
    let config = test_config();
    let result = Booth::from_config(config, PhotoRegistry::new(), EventBus::default());
    assert!(matches!(result, Err(AppError::Camera(_))));
}
