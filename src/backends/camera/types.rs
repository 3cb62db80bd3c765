// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::constants;

/// Single-channel 16-bit depth grid (raw device units, 0 = no data)
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Camera backend type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// Intel RealSense via librealsense2
    #[value(name = "realsense")]
    RealSense,
    /// Generated scene, no hardware needed
    #[default]
    Synthetic,
    /// Previously collected frame pairs read back from disk
    Replay,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::RealSense => write!(f, "RealSense"),
            CameraBackendType::Synthetic => write!(f, "synthetic"),
            CameraBackendType::Replay => write!(f, "replay"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    pub serial: Option<String>,
    pub backend: CameraBackendType,
}

/// Requested stream parameters, applied to both depth and color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: constants::stream::WIDTH,
            height: constants::stream::HEIGHT,
            fps: constants::stream::FPS,
        }
    }
}

impl std::fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {}fps", self.width, self.height, self.fps)
    }
}

/// Pinhole intrinsics of one stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub ppx: f32,
    pub ppy: f32,
}

impl Intrinsics {
    /// Rescale to another resolution of the same sensor
    pub fn scaled_to(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return *self;
        }
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Self {
            width,
            height,
            fx: self.fx * sx,
            fy: self.fy * sy,
            ppx: self.ppx * sx,
            ppy: self.ppy * sy,
        }
    }

    /// Pixel + depth (meters) to a 3D point in this camera's frame
    pub fn deproject(&self, px: f32, py: f32, z: f32) -> [f32; 3] {
        [(px - self.ppx) / self.fx * z, (py - self.ppy) / self.fy * z, z]
    }

    /// 3D point to pixel coordinates (not rounded)
    pub fn project(&self, point: [f32; 3]) -> (f32, f32) {
        let [x, y, z] = point;
        (x / z * self.fx + self.ppx, y / z * self.fy + self.ppy)
    }
}

/// Rigid transform from one stream's frame into another's
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    /// 3x3 rotation, column-major
    pub rotation: [f32; 9],
    /// Translation in meters
    pub translation: [f32; 3],
}

impl Extrinsics {
    pub const IDENTITY: Self = Self {
        rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        translation: [0.0, 0.0, 0.0],
    };

    pub fn translation_only(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Everything the alignment stage needs to know about the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamCalibration {
    pub depth: Intrinsics,
    pub color: Intrinsics,
    pub depth_to_color: Extrinsics,
    /// Meters per depth unit
    pub depth_scale: f32,
}

/// One poll's worth of time-correlated samples
///
/// Either component may be missing when the device delivers a partial set.
#[derive(Debug, Clone)]
pub struct FrameBundle {
    pub frame_number: u64,
    pub depth: Option<DepthImage>,
    pub color: Option<RgbImage>,
}

impl FrameBundle {
    /// Keep the bundle only if both components are present and non-empty
    pub fn into_complete(self) -> Option<RgbdFrames> {
        let depth = self.depth.filter(|d| d.width() > 0 && d.height() > 0)?;
        let color = self.color.filter(|c| c.width() > 0 && c.height() > 0)?;
        Some(RgbdFrames {
            frame_number: self.frame_number,
            depth,
            color,
        })
    }
}

/// A bundle with both components present
#[derive(Debug, Clone)]
pub struct RgbdFrames {
    pub frame_number: u64,
    pub depth: DepthImage,
    pub color: RgbImage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_bundles_rejected() {
        let missing_color = FrameBundle {
            frame_number: 1,
            depth: Some(DepthImage::new(4, 4)),
            color: None,
        };
        assert!(missing_color.into_complete().is_none());

        let empty_depth = FrameBundle {
            frame_number: 2,
            depth: Some(DepthImage::new(0, 0)),
            color: Some(RgbImage::new(4, 4)),
        };
        assert!(empty_depth.into_complete().is_none());

        let full = FrameBundle {
            frame_number: 3,
            depth: Some(DepthImage::new(4, 4)),
            color: Some(RgbImage::new(4, 4)),
        };
        assert_eq!(full.into_complete().map(|f| f.frame_number), Some(3));
    }

    #[test]
    fn test_intrinsics_scaling() {
        let intr = Intrinsics {
            width: 640,
            height: 480,
            fx: 600.0,
            fy: 600.0,
            ppx: 320.0,
            ppy: 240.0,
        };
        let half = intr.scaled_to(320, 240);
        assert_eq!(half.fx, 300.0);
        assert_eq!(half.ppy, 120.0);
        assert_eq!(intr.scaled_to(640, 480), intr);
    }

    #[test]
    fn test_project_inverts_deproject() {
        let intr = Intrinsics {
            width: 640,
            height: 480,
            fx: 615.0,
            fy: 612.0,
            ppx: 318.2,
            ppy: 241.7,
        };
        let p = intr.deproject(100.0, 400.0, 1.25);
        let (u, v) = intr.project(p);
        assert!((u - 100.0).abs() < 1e-3);
        assert!((v - 400.0).abs() < 1e-3);
    }
}
