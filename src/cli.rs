// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for kiosk operations
//!
//! This module provides command-line functionality for:
//! - Running the capture page
//! - Taking a single photo
//! - Listing available cameras
//! - Retrying the last upload
//! - Inspecting the configuration

use crate::Overrides;
use selfie_kiosk::backends::camera::{CameraStreamManager, backend_from_settings};
use selfie_kiosk::errors::{CameraError, SessionError, UploadError};
use selfie_kiosk::link::CodePayload;
use selfie_kiosk::pipelines::photo::{EncodedImage, EncodingFormat, PhotoEncoder};
use selfie_kiosk::storage::LastImageCache;
use selfie_kiosk::upload::{UploadClient, retry_last, spawn_uploader};
use selfie_kiosk::{AppError, Booth, Config, EventBus, NotificationLevel, PhotoRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Longest code value printed in full
const MAX_PRINTED_VALUE: usize = 96;

/// Load the config file and apply command-line overrides
pub fn load_config(overrides: &Overrides) -> Result<Config, AppError> {
    let mut config = match &overrides.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(seconds) = overrides.countdown {
        config.countdown_seconds = seconds;
    }
    if let Some(backend) = overrides.backend {
        config.camera.backend = backend;
    }
    if let Some(device) = &overrides.device {
        config.camera.device = Some(device.clone());
    }
    if let Some(source) = &overrides.source {
        config.camera.source_path = Some(source.clone());
    }
    if let Some(watermark) = &overrides.watermark {
        config.watermark.path = watermark.clone();
    }
    if let Some(endpoint) = &overrides.endpoint {
        config.upload.endpoint = Some(endpoint.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Single-threaded runtime the whole kiosk runs on
fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Run the capture page: countdown, capture, show the code, retake
pub fn run_booth(config: Config, rounds: u32, hold_secs: u64) -> CliResult {
    let rt = runtime()?;
    rt.block_on(async move {
        let events = EventBus::default();
        let registry = PhotoRegistry::new();

        let printer = tokio::spawn(print_notifications(events.subscribe_notifications()));
        let upload_grace = upload_grace(&config);
        let uploader = start_uploader(&config, &events)?;

        let mut booth = Booth::from_config(config, registry, events)?;
        let teardown = booth.teardown_handle();
        let handler = teardown.clone();
        ctrlc::set_handler(move || handler.trigger())?;

        let stream = booth.mount()?;
        println!("Camera ready: {}", stream);

        let mut taken = 0;
        while !teardown.is_triggered() && (rounds == 0 || taken < rounds) {
            booth.start_countdown()?;
            let photo = match booth.run_countdown(|n| println!("{}", n)).await {
                Ok(photo) => photo,
                Err(AppError::Session(SessionError::TornDown)) => break,
                Err(AppError::Photo(e)) => {
                    eprintln!("Capture failed: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            taken += 1;
            selfie_kiosk::booth::log_capture(&photo);
            println!("Photo {} captured", photo.id);
            print_payload(&booth.resolve_link(&photo.id)?);

            tokio::select! {
                _ = teardown.wait() => break,
                _ = tokio::time::sleep(Duration::from_secs(hold_secs)) => {}
            }
            if rounds == 0 || taken < rounds {
                booth.retake()?;
            }
        }

        booth.teardown();
        drop(booth);
        finish_uploader(uploader, upload_grace).await;
        printer.abort();
        println!("Booth closed after {} photo(s)", taken);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Take a single photo, print its code and optionally save the JPEG
pub fn capture_once(config: Config, output: Option<PathBuf>) -> CliResult {
    let rt = runtime()?;
    rt.block_on(async move {
        let events = EventBus::default();
        let registry = PhotoRegistry::new();
        let upload_grace = upload_grace(&config);
        let uploader = start_uploader(&config, &events)?;

        let mut booth = Booth::from_config(config, registry, events)?;
        let handler = booth.teardown_handle();
        ctrlc::set_handler(move || handler.trigger())?;

        booth.mount()?;
        booth.start_countdown()?;
        let photo = booth.run_countdown(|n| println!("{}", n)).await?;
        println!("Photo {} captured", photo.id);
        print_payload(&booth.resolve_link(&photo.id)?);

        if let Some(dir) = output {
            let data = photo
                .image
                .decode_bytes()
                .ok_or_else(|| AppError::Other("photo is not a base64 data URI".to_string()))?;
            let encoded = EncodedImage {
                data,
                format: EncodingFormat::Jpeg,
                width: photo.image.width(),
                height: photo.image.height(),
            };
            let path = PhotoEncoder::save(&encoded, &dir).await?;
            println!("Saved: {}", path.display());
        }

        booth.teardown();
        drop(booth);
        finish_uploader(uploader, upload_grace).await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Subscribe the upload collaborator to the booth's photo events
fn start_uploader(config: &Config, events: &EventBus) -> Result<JoinHandle<()>, UploadError> {
    let client = UploadClient::from_settings(&config.upload)?;
    let cache = config
        .upload
        .cache_last_image
        .then(LastImageCache::in_cache_dir)
        .flatten();
    Ok(spawn_uploader(
        client,
        cache,
        events.subscribe_photos(),
        events.notifier(),
    ))
}

/// Longest wait for the uploader once the booth is gone
fn upload_grace(config: &Config) -> Duration {
    Duration::from_secs(config.upload.timeout_secs + 1)
}

/// Let the uploader drain the closed photo channel, then give up
async fn finish_uploader(uploader: JoinHandle<()>, grace: Duration) {
    let abort = uploader.abort_handle();
    if tokio::time::timeout(grace, uploader).await.is_err() {
        warn!("Uploader still busy, abandoning pending upload");
        abort.abort();
    }
}

/// List all available cameras
pub fn list_cameras(config: &Config) -> CliResult {
    let backend = backend_from_settings(&config.camera).map_err(CameraError::from)?;
    let manager = CameraStreamManager::new(backend);

    let cameras = match manager.enumerate_cameras() {
        Ok(cameras) => cameras,
        Err(CameraError::NoCameraFound) => {
            println!("No cameras found.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Available cameras ({}):", manager.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(location) = &camera.camera_location {
            println!("      Location: {}", location);
        }
    }

    Ok(())
}

/// Upload the cached last image
pub fn upload_last(config: &Config) -> CliResult {
    let client = UploadClient::from_settings(&config.upload)?.ok_or(UploadError::NotConfigured)?;
    let cache = LastImageCache::in_cache_dir().ok_or(UploadError::NothingCached)?;

    let rt = runtime()?;
    let ack = rt.block_on(retry_last(&client, &cache))?;
    println!("Uploaded to {}", client.endpoint());
    println!("{}", ack);
    Ok(())
}

/// Print (and optionally persist) the effective configuration
pub fn show_config(config: &Config, overrides: &Overrides, save: bool) -> CliResult {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = config_path(overrides)
            .ok_or_else(|| AppError::Config("no config directory on this system".to_string()))?;
        config.save_to(&path)?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn config_path(overrides: &Overrides) -> Option<PathBuf> {
    overrides.config.clone().or_else(Config::default_path)
}

fn print_payload(payload: &CodePayload) {
    let value = &payload.value;
    if value.len() > MAX_PRINTED_VALUE {
        println!(
            "Code: {}... ({} bytes)",
            value.chars().take(MAX_PRINTED_VALUE).collect::<String>(),
            value.len()
        );
    } else {
        println!("Code: {}", value);
    }
    println!(
        "      size {} / level {} / margin {}",
        payload.display.size,
        payload.display.level.letter(),
        if payload.display.include_margin { "on" } else { "off" }
    );
}

async fn print_notifications(mut rx: broadcast::Receiver<selfie_kiosk::Notification>) {
    loop {
        match rx.recv().await {
            Ok(note) => match note.level {
                NotificationLevel::Info => println!("{}", note.message),
                NotificationLevel::Warning | NotificationLevel::Error => {
                    eprintln!("{}", note.message)
                }
            },
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
