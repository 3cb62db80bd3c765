// SPDX-License-Identifier: GPL-3.0-only

//! Generated RGB-D scene
//!
//! Renders a sphere drifting in front of a tilted back wall, seen from a
//! depth camera and a color camera 15 mm to its right. Depth has the
//! invalid left-edge band real stereo depth sensors show. The calibration
//! is exact, so aligned output can be checked against the geometry.

use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use tracing::{debug, info};

use super::types::{
    CameraBackendType, CameraDevice, DepthImage, Extrinsics, FrameBundle, Intrinsics,
    StreamCalibration, StreamConfig,
};
use super::CameraBackend;
use crate::constants;
use crate::errors::{BackendResult, CameraError};

/// Depth-to-color baseline (meters)
const BASELINE_M: f32 = 0.015;
const SPHERE_RADIUS_M: f32 = 0.25;
const SPHERE_DEPTH_M: f32 = 1.2;
const WALL_NEAR_M: f32 = 2.0;
const WALL_FAR_M: f32 = 3.0;
/// Fraction of depth columns on the left edge with no data
const INVALID_BAND: f32 = 0.05;

pub fn device() -> CameraDevice {
    CameraDevice {
        name: "Synthetic RGB-D scene".to_string(),
        serial: None,
        backend: CameraBackendType::Synthetic,
    }
}

/// Exact calibration of the generated cameras
pub fn calibration(config: &StreamConfig) -> StreamCalibration {
    let (w, h) = (config.width as f32, config.height as f32);
    StreamCalibration {
        depth: Intrinsics {
            width: config.width,
            height: config.height,
            fx: 0.6 * w,
            fy: 0.6 * w,
            ppx: w / 2.0,
            ppy: h / 2.0,
        },
        color: Intrinsics {
            width: config.width,
            height: config.height,
            fx: 0.96 * w,
            fy: 0.96 * w,
            ppx: w / 2.0,
            ppy: h / 2.0,
        },
        depth_to_color: Extrinsics::translation_only([-BASELINE_M, 0.0, 0.0]),
        depth_scale: constants::depth::DEFAULT_SCALE,
    }
}

pub struct SyntheticBackend {
    calibration: Option<StreamCalibration>,
    frame_period: Option<Duration>,
    next_deadline: Option<Instant>,
    frame_number: u64,
    drop_color_every: Option<u64>,
}

impl SyntheticBackend {
    /// Backend paced at the configured frame rate
    pub fn new() -> Self {
        Self {
            calibration: None,
            frame_period: Some(Duration::ZERO),
            next_deadline: None,
            frame_number: 0,
            drop_color_every: None,
        }
    }

    /// Backend that returns frames as fast as they are rendered
    pub fn unpaced() -> Self {
        Self {
            frame_period: None,
            ..Self::new()
        }
    }

    /// Deliver every `n`th bundle without its color component
    pub fn with_dropped_color_every(mut self, n: u64) -> Self {
        self.drop_color_every = Some(n.max(1));
        self
    }

    fn pace(&mut self) {
        let Some(period) = self.frame_period else {
            return;
        };
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline
            && deadline > now
        {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(Instant::now() + period);
    }

    /// Sphere center in the depth camera frame for a given frame
    fn sphere_center(frame_number: u64) -> [f32; 3] {
        let t = frame_number as f32 / 45.0;
        [0.35 * t.sin(), 0.1 * (2.0 * t).cos(), SPHERE_DEPTH_M]
    }

    fn render_depth(&self, cal: &StreamCalibration, center: [f32; 3]) -> DepthImage {
        let intr = &cal.depth;
        let invalid_cols = (intr.width as f32 * INVALID_BAND) as u32;
        DepthImage::from_fn(intr.width, intr.height, |u, v| {
            if u < invalid_cols {
                return image::Luma([constants::depth::INVALID]);
            }
            let z = scene_depth(intr, u as f32, v as f32, center);
            image::Luma([(z / cal.depth_scale).round().min(u16::MAX as f32) as u16])
        })
    }

    fn render_color(&self, cal: &StreamCalibration, center: [f32; 3]) -> RgbImage {
        let intr = &cal.color;
        let t = cal.depth_to_color.translation;
        let center = [center[0] + t[0], center[1] + t[1], center[2] + t[2]];
        RgbImage::from_fn(intr.width, intr.height, |u, v| {
            let (u, v) = (u as f32, v as f32);
            match sphere_hit(intr, u, v, center) {
                Some(z) => {
                    // Shade by distance from the front of the sphere
                    let shade = 1.0 - ((z - (center[2] - SPHERE_RADIUS_M)) / SPHERE_RADIUS_M);
                    let shade = shade.clamp(0.25, 1.0);
                    Rgb([(240.0 * shade) as u8, (140.0 * shade) as u8, (40.0 * shade) as u8])
                }
                None => {
                    let fy = v / intr.height as f32;
                    let checker = ((u as u32 / 40) + (v as u32 / 40)) % 2 == 0;
                    let base = if checker { 200.0 } else { 170.0 };
                    let g = base * (0.6 + 0.4 * fy);
                    Rgb([(g * 0.8) as u8, g as u8, (g * 0.9) as u8])
                }
            }
        })
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration> {
        if config.width == 0 || config.height == 0 || config.fps == 0 {
            return Err(CameraError::UnsupportedConfiguration(config.to_string()));
        }
        let calibration = calibration(config);
        if self.frame_period.is_some() {
            self.frame_period = Some(Duration::from_secs_f64(1.0 / config.fps as f64));
        }
        self.calibration = Some(calibration);
        self.frame_number = 0;
        self.next_deadline = None;
        info!(config = %config, "Synthetic camera started");
        Ok(calibration)
    }

    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
        let cal = self.calibration.ok_or(CameraError::NotStreaming)?;
        self.pace();
        self.frame_number += 1;

        let center = Self::sphere_center(self.frame_number);
        let depth = self.render_depth(&cal, center);
        let drop_color = self
            .drop_color_every
            .is_some_and(|n| self.frame_number % n == 0);
        let color = if drop_color {
            debug!(frame = self.frame_number, "Dropping color component");
            None
        } else {
            Some(self.render_color(&cal, center))
        };

        Ok(FrameBundle {
            frame_number: self.frame_number,
            depth: Some(depth),
            color,
        })
    }

    fn stop(&mut self) {
        if self.calibration.take().is_some() {
            info!(frames = self.frame_number, "Synthetic camera stopped");
        }
    }
}

fn sphere_hit(intr: &Intrinsics, u: f32, v: f32, center: [f32; 3]) -> Option<f32> {
    // Ray with z = 1 so the ray parameter is the depth
    let d = [(u - intr.ppx) / intr.fx, (v - intr.ppy) / intr.fy, 1.0];
    let a = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
    let b = -2.0 * (d[0] * center[0] + d[1] * center[1] + d[2] * center[2]);
    let c = center[0] * center[0] + center[1] * center[1] + center[2] * center[2]
        - SPHERE_RADIUS_M * SPHERE_RADIUS_M;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (t > 0.0).then_some(t)
}

fn scene_depth(intr: &Intrinsics, u: f32, v: f32, center: [f32; 3]) -> f32 {
    sphere_hit(intr, u, v, center).unwrap_or_else(|| {
        // Wall leans away towards the top of the image
        let fy = v / intr.height as f32;
        WALL_FAR_M - (WALL_FAR_M - WALL_NEAR_M) * fy
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_match_config() {
        let mut backend = SyntheticBackend::unpaced();
        let config = StreamConfig {
            width: 64,
            height: 48,
            fps: 30,
        };
        backend.start(&config).unwrap();
        let bundle = backend.wait_for_frames().unwrap();
        let frames = bundle.into_complete().unwrap();
        assert_eq!(frames.depth.dimensions(), (64, 48));
        assert_eq!(frames.color.dimensions(), (64, 48));
        // Invalid band on the left, valid data in the middle
        assert_eq!(frames.depth.get_pixel(0, 24)[0], 0);
        assert!(frames.depth.get_pixel(32, 24)[0] > 0);
    }

    #[test]
    fn test_sphere_is_nearer_than_wall() {
        let mut backend = SyntheticBackend::unpaced();
        let config = StreamConfig {
            width: 64,
            height: 48,
            fps: 30,
        };
        backend.start(&config).unwrap();
        let depth = backend.wait_for_frames().unwrap().depth.unwrap();
        let center = depth.get_pixel(32, 24)[0];
        let corner = depth.get_pixel(63, 0)[0];
        assert!(center < corner, "sphere {center} should be nearer than wall {corner}");
    }

    #[test]
    fn test_dropped_color() {
        let mut backend = SyntheticBackend::unpaced().with_dropped_color_every(2);
        backend
            .start(&StreamConfig {
                width: 16,
                height: 12,
                fps: 30,
            })
            .unwrap();
        assert!(backend.wait_for_frames().unwrap().color.is_some());
        assert!(backend.wait_for_frames().unwrap().color.is_none());
    }

    #[test]
    fn test_poll_before_start_fails() {
        let mut backend = SyntheticBackend::unpaced();
        assert!(matches!(
            backend.wait_for_frames(),
            Err(CameraError::NotStreaming)
        ));
    }
}
