// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, StreamConfig};
use crate::constants::{dataset, depth};
use crate::errors::AppError;
use crate::storage::{self, DatasetLayout};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the capture loop does with the frames
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Preview color and aligned depth only
    #[default]
    Stream,
    /// Preview with labels and save frame pairs on demand
    Collect,
}

/// What happens when a scene already holds captures from an earlier run
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Continue numbering after the highest existing index
    #[default]
    Resume,
    /// Restart at 1 and replace existing files
    Overwrite,
    /// Restart at 1 and fail any save whose target exists
    Refuse,
}

/// Depth colormap
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Blue (near) to red (far)
    #[default]
    Jet,
    /// Perceptually smoother rainbow
    Turbo,
    /// Bright (near) to dark (far)
    Grayscale,
}

/// Depth colorizer settings
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ColorizerSettings {
    pub scheme: ColorScheme,
    /// Spread colors by the frame's depth histogram instead of a fixed range
    pub equalize: bool,
    pub min_meters: f32,
    pub max_meters: f32,
}

impl Default for ColorizerSettings {
    fn default() -> Self {
        Self {
            scheme: ColorScheme::default(),
            equalize: true,
            min_meters: depth::MIN_METERS,
            max_meters: depth::MAX_METERS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Serialize)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// RealSense serial number, first device when unset
    pub device_serial: Option<String>,
    pub stream: StreamConfig,
    pub colorizer: ColorizerSettings,
    /// Scene label shared by both output trees
    pub scene: String,
    pub dataset_root: PathBuf,
    /// Overrides `<dataset_root>/rgb`
    pub rgb_root: Option<PathBuf>,
    /// Overrides `<dataset_root>/depth`
    pub depth_root: Option<PathBuf>,
    pub overwrite: OverwritePolicy,
    /// Dataset root the replay backend reads from, `dataset_root` when unset
    pub replay_root: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            backend: CameraBackendType::default(),
            device_serial: None,
            stream: StreamConfig::default(),
            colorizer: ColorizerSettings::default(),
            scene: dataset::DEFAULT_SCENE.to_string(),
            dataset_root: PathBuf::from(dataset::DEFAULT_ROOT),
            rgb_root: None,
            depth_root: None,
            overwrite: OverwritePolicy::default(),
            replay_root: None,
        }
    }
}

impl CaptureConfig {
    pub fn rgb_root(&self) -> PathBuf {
        self.rgb_root
            .clone()
            .unwrap_or_else(|| self.dataset_root.join(dataset::RGB_DIR))
    }

    pub fn depth_root(&self) -> PathBuf {
        self.depth_root
            .clone()
            .unwrap_or_else(|| self.dataset_root.join(dataset::DEPTH_DIR))
    }

    pub fn replay_rgb_root(&self) -> PathBuf {
        match &self.replay_root {
            Some(root) => root.join(dataset::RGB_DIR),
            None => self.rgb_root(),
        }
    }

    pub fn replay_depth_root(&self) -> PathBuf {
        match &self.replay_root {
            Some(root) => root.join(dataset::DEPTH_DIR),
            None => self.depth_root(),
        }
    }

    /// Output layout for the configured scene
    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(self.rgb_root(), self.depth_root(), &self.scene)
    }

    /// Check settings that clap cannot
    pub fn validate(&self) -> Result<(), AppError> {
        storage::validate_scene_label(&self.scene)
            .map_err(|e| AppError::Config(e.to_string()))?;
        if self.stream.width == 0 || self.stream.height == 0 || self.stream.fps == 0 {
            return Err(AppError::Config(format!(
                "stream size and rate must be non-zero, got {}",
                self.stream
            )));
        }
        if !self.colorizer.equalize && self.colorizer.min_meters >= self.colorizer.max_meters {
            return Err(AppError::Config(format!(
                "depth range {}..{} m is empty",
                self.colorizer.min_meters, self.colorizer.max_meters
            )));
        }
        Ok(())
    }
}
