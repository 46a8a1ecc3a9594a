// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use selfie_kiosk::constants::{self, EncodingQuality};

#[test]
fn test_quality_preset_count() {
    // Test that all presets exist (Low, Medium, High, Maximum)
    assert_eq!(EncodingQuality::ALL.len(), 4);
}

#[test]
fn test_quality_preset_ordering() {
    // Presets are ordered from lowest to highest quality
    let mut prev = 0u8;
    for preset in EncodingQuality::ALL {
        let quality = preset.jpeg_quality();
        assert!(quality > prev, "Presets should be ordered from lowest to highest");
        assert!(quality <= 100);
        prev = quality;
    }
}

#[test]
fn test_default_quality_is_high() {
    assert_eq!(EncodingQuality::default(), EncodingQuality::High);
    assert_eq!(EncodingQuality::default().jpeg_quality(), 92);
}

#[test]
fn test_quality_display_names() {
    for preset in EncodingQuality::ALL {
        assert!(!preset.display_name().is_empty());
    }
}

#[test]
fn test_countdown_bounds() {
    assert!(constants::countdown::DEFAULT_SECONDS >= 1);
    assert!(constants::countdown::DEFAULT_SECONDS <= constants::countdown::MAX_SECONDS);
    assert_eq!(constants::countdown::TICK.as_millis(), 1000);
}

#[test]
fn test_preferred_stream_is_portrait() {
    assert!(constants::camera::PREFERRED_HEIGHT > constants::camera::PREFERRED_WIDTH);
    assert!(constants::camera::ASPECT_NUM < constants::camera::ASPECT_DENOM);
}

#[test]
fn test_watermark_opacity_in_range() {
    assert!((0.0..=1.0).contains(&constants::watermark::OPACITY));
    assert!((0.0..=1.0).contains(&constants::watermark::FALLBACK_ALPHA));
    assert!(!constants::watermark::FALLBACK_LABEL.is_empty());
}

#[test]
fn test_code_defaults() {
    assert_eq!(constants::code::SIZE, 256);
    assert!(constants::code::INCLUDE_MARGIN);
}

#[test]
fn test_version_is_set() {
    assert!(!constants::app_info::version().is_empty());
}
