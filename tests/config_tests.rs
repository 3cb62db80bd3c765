// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use std::path::PathBuf;

use depth_capture::backends::camera::CameraBackendType;
use depth_capture::config::{CaptureConfig, CaptureMode, ColorScheme, OverwritePolicy};
use depth_capture::errors::AppError;

#[test]
fn test_config_default() {
    let config = CaptureConfig::default();

    assert_eq!(config.mode, CaptureMode::Stream);
    assert_eq!(config.backend, CameraBackendType::Synthetic);
    assert_eq!(config.scene, "scene_1");
    assert_eq!(config.overwrite, OverwritePolicy::Resume);
    assert_eq!(config.colorizer.scheme, ColorScheme::Jet);
    assert!(config.colorizer.equalize);
    assert_eq!(
        (config.stream.width, config.stream.height, config.stream.fps),
        (640, 480, 30)
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_dataset_layout() {
    let config = CaptureConfig::default();
    let layout = config.layout();
    assert_eq!(
        layout.color_path(1),
        PathBuf::from("../self_collected_dataset/rgb/scene_1/image_0001.png")
    );
    assert_eq!(
        layout.depth_path(1),
        PathBuf::from("../self_collected_dataset/depth/scene_1/image_0001.png")
    );
}

#[test]
fn test_roots_override_independently() {
    let config = CaptureConfig {
        scene: "desk".to_string(),
        depth_root: Some(PathBuf::from("/mnt/depth")),
        ..CaptureConfig::default()
    };
    let layout = config.layout();
    assert_eq!(
        layout.rgb_dir(),
        PathBuf::from("../self_collected_dataset/rgb/desk")
    );
    assert_eq!(layout.depth_dir(), PathBuf::from("/mnt/depth/desk"));
}

#[test]
fn test_replay_reads_from_replay_root() {
    let config = CaptureConfig {
        replay_root: Some(PathBuf::from("/old")),
        ..CaptureConfig::default()
    };
    assert_eq!(config.replay_rgb_root(), PathBuf::from("/old/rgb"));
    assert_eq!(config.replay_depth_root(), PathBuf::from("/old/depth"));
    // Output still goes to the dataset root
    assert_eq!(
        config.rgb_root(),
        PathBuf::from("../self_collected_dataset/rgb")
    );
}

#[test]
fn test_validation_rejects_bad_settings() {
    let bad_scene = CaptureConfig {
        scene: "../escape".to_string(),
        ..CaptureConfig::default()
    };
    assert!(matches!(bad_scene.validate(), Err(AppError::Config(_))));

    let mut zero_fps = CaptureConfig::default();
    zero_fps.stream.fps = 0;
    assert!(matches!(zero_fps.validate(), Err(AppError::Config(_))));

    let mut empty_range = CaptureConfig::default();
    empty_range.colorizer.equalize = false;
    empty_range.colorizer.min_meters = 2.0;
    empty_range.colorizer.max_meters = 1.0;
    assert!(matches!(empty_range.validate(), Err(AppError::Config(_))));
}

#[test]
fn test_config_serializes_lowercase_names() {
    let config = CaptureConfig {
        mode: CaptureMode::Collect,
        overwrite: OverwritePolicy::Refuse,
        ..CaptureConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"mode\":\"collect\""));
    assert!(json.contains("\"overwrite\":\"refuse\""));
    assert!(json.contains("\"backend\":\"synthetic\""));

    let parsed: CaptureConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
