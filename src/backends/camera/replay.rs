// SPDX-License-Identifier: GPL-3.0-only

//! Replay of a collected scene
//!
//! Streams `image_NNNN.png` pairs back from a scene's color and depth
//! directories in index order, wrapping around at the end. Saved depth is
//! already aligned to color, so the reported calibration uses the color
//! intrinsics for both streams and an identity transform.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::types::{
    CameraBackendType, DepthImage, Extrinsics, FrameBundle, Intrinsics, StreamCalibration,
    StreamConfig,
};
use super::CameraBackend;
use crate::constants;
use crate::errors::{BackendResult, CameraError};
use crate::storage::{self, DatasetLayout};

pub struct ReplayBackend {
    layout: DatasetLayout,
    indices: Vec<u32>,
    cursor: usize,
    frame_number: u64,
    frame_period: Duration,
    next_deadline: Option<Instant>,
    streaming: bool,
}

impl ReplayBackend {
    pub fn new(layout: DatasetLayout) -> Self {
        Self {
            layout,
            indices: Vec::new(),
            cursor: 0,
            frame_number: 0,
            frame_period: Duration::ZERO,
            next_deadline: None,
            streaming: false,
        }
    }

    fn pace(&mut self) {
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline
            && deadline > now
        {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(Instant::now() + self.frame_period);
    }

    fn load_pair(&self, index: u32) -> (Option<DepthImage>, Option<image::RgbImage>) {
        let color_path = self.layout.color_path(index);
        let depth_path = self.layout.depth_path(index);

        let color = match image::open(&color_path) {
            Ok(img) => Some(img.into_rgb8()),
            Err(e) => {
                debug!(path = %color_path.display(), error = %e, "Color frame unreadable");
                None
            }
        };
        let depth = match image::open(&depth_path) {
            Ok(img) => Some(img.into_luma16()),
            Err(e) => {
                debug!(path = %depth_path.display(), error = %e, "Depth frame unreadable");
                None
            }
        };
        (depth, color)
    }

    fn calibration_for(&self, index: u32, config: &StreamConfig) -> StreamCalibration {
        if let Some(record) = storage::read_calibration(&self.layout) {
            let color = record.calibration.color;
            return StreamCalibration {
                depth: color,
                color,
                depth_to_color: Extrinsics::IDENTITY,
                depth_scale: record.calibration.depth_scale,
            };
        }

        // No sidecar: any pinhole model works since both grids coincide
        let (width, height) = image::image_dimensions(self.layout.color_path(index))
            .unwrap_or((config.width, config.height));
        let intr = Intrinsics {
            width,
            height,
            fx: width as f32,
            fy: width as f32,
            ppx: width as f32 / 2.0,
            ppy: height as f32 / 2.0,
        };
        StreamCalibration {
            depth: intr,
            color: intr,
            depth_to_color: Extrinsics::IDENTITY,
            depth_scale: constants::depth::DEFAULT_SCALE,
        }
    }
}

impl CameraBackend for ReplayBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Replay
    }

    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration> {
        self.indices = self.layout.existing_indices();
        let Some(&first) = self.indices.first() else {
            return Err(CameraError::InitializationFailed(format!(
                "no frame pairs under {}",
                self.layout.rgb_dir().display()
            )));
        };

        let calibration = self.calibration_for(first, config);
        if calibration.color.width != config.width || calibration.color.height != config.height {
            warn!(
                recorded = %format!("{}x{}", calibration.color.width, calibration.color.height),
                requested = %config,
                "Replay resolution differs from requested stream size"
            );
        }

        self.frame_period = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);
        self.cursor = 0;
        self.frame_number = 0;
        self.next_deadline = None;
        self.streaming = true;
        info!(
            scene = self.layout.scene(),
            pairs = self.indices.len(),
            "Replay started"
        );
        Ok(calibration)
    }

    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
        if !self.streaming || self.indices.is_empty() {
            return Err(CameraError::NotStreaming);
        }
        self.pace();

        let index = self.indices[self.cursor];
        self.cursor = (self.cursor + 1) % self.indices.len();
        self.frame_number += 1;

        let (depth, color) = self.load_pair(index);
        Ok(FrameBundle {
            frame_number: self.frame_number,
            depth,
            color,
        })
    }

    fn stop(&mut self) {
        if self.streaming {
            self.streaming = false;
            info!(frames = self.frame_number, "Replay stopped");
        }
    }
}
