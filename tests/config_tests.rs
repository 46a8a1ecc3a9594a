// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use selfie_kiosk::backends::camera::CameraBackendType;
use selfie_kiosk::link::{ErrorCorrection, LinkPolicy};
use selfie_kiosk::upload::UploadNaming;
use selfie_kiosk::{AppError, Config, EncodingQuality};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("selfie-kiosk-config-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.countdown_seconds, 10);
    assert!(
        !config.allow_countdown_cancel,
        "Countdown cancellation should be off by default"
    );
    assert_eq!(config.camera.backend, CameraBackendType::Still);
    assert_eq!((config.camera.width, config.camera.height), (1080, 1920));
    assert_eq!(config.jpeg_quality, EncodingQuality::High);
    assert_eq!(config.upload.endpoint, None);
    assert_eq!(config.upload.naming, UploadNaming::PerPhoto);
    assert_eq!(config.link.policy, LinkPolicy::Embedded);
    assert_eq!(config.link.code.level, ErrorCorrection::High);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_yields_defaults() {
    let path = temp_path("does-not-exist.json");
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}

#[test]
fn test_save_and_load() {
    let path = temp_path("config.json");
    let mut config = Config::default();
    config.countdown_seconds = 5;
    config.allow_countdown_cancel = true;
    config.upload.endpoint = Some("https://kiosk.example.org/upload".to_string());
    config.upload.naming = UploadNaming::legacy_fixed();
    config.link.policy = LinkPolicy::Remote {
        public_base: "https://kiosk.example.org".to_string(),
    };

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn test_malformed_file_is_config_error() {
    let path = temp_path("config.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let path = temp_path("config.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "countdown_seconds": 600 }"#).unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_endpoint_must_be_http() {
    let mut config = Config::default();
    config.upload.endpoint = Some("ftp://example.org".to_string());
    assert!(config.validate().is_err());

    config.upload.endpoint = Some("http://localhost:8080/upload".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_json_field_names() {
    let config: Config = serde_json::from_str(
        r#"{
            "camera": { "backend": "gstreamer", "device": "/dev/video0" },
            "viewport": { "width": 1920, "height": 1080 },
            "jpeg_quality": "Maximum",
            "link": { "policy": { "mode": "remote", "public_base": "https://x" } }
        }"#,
    )
    .unwrap();

    assert_eq!(config.camera.backend, CameraBackendType::GStreamer);
    assert_eq!(config.camera.device.as_deref(), Some("/dev/video0"));
    assert_eq!(config.viewport.width, 1920);
    assert_eq!(config.jpeg_quality, EncodingQuality::Maximum);
    assert!(matches!(config.link.policy, LinkPolicy::Remote { .. }));
}
