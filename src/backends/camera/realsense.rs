// SPDX-License-Identifier: GPL-3.0-only

//! Intel RealSense backend (librealsense2 through `realsense-rust`)
//!
//! Depth is requested as Z16 and color as RGB8 at the same resolution and
//! rate. Intrinsics and the depth-to-color extrinsics come from the active
//! pipeline's stream profiles; the depth unit is read from the first depth
//! frame after start.

use std::collections::HashSet;
use std::ffi::{CStr, CString};

use image::{Luma, Rgb, RgbImage};
use realsense_rust::{
    base::{Rs2Extrinsics, Rs2Intrinsics},
    config::Config,
    context::Context,
    device::Device,
    frame::{ColorFrame, DepthFrame, FrameEx, PixelKind},
    kind::{Rs2CameraInfo, Rs2Format, Rs2StreamKind},
    pipeline::{ActivePipeline, InactivePipeline},
};
use tracing::{debug, info, warn};

use super::types::*;
use super::CameraBackend;
use crate::constants::{depth, timing};
use crate::errors::{BackendResult, CameraError};

/// Frame sets to wait through for the first depth unit after start
const WARMUP_ATTEMPTS: usize = 30;

fn info_string(device: &Device, info: Rs2CameraInfo) -> Option<String> {
    device
        .info(info)
        .map(|s: &CStr| s.to_string_lossy().into_owned())
}

/// List connected RealSense devices
pub fn enumerate_devices() -> BackendResult<Vec<CameraDevice>> {
    let context = Context::new().map_err(|e| CameraError::BackendUnavailable(e.to_string()))?;
    let devices = context.query_devices(HashSet::new());
    let found: Vec<CameraDevice> = devices
        .iter()
        .map(|device| CameraDevice {
            name: info_string(device, Rs2CameraInfo::Name)
                .unwrap_or_else(|| "RealSense".to_string()),
            serial: info_string(device, Rs2CameraInfo::SerialNumber),
            backend: CameraBackendType::RealSense,
        })
        .collect();
    info!(count = found.len(), "Enumerated RealSense devices");
    Ok(found)
}

pub struct RealSenseBackend {
    context: Context,
    serial: Option<String>,
    pipeline: Option<ActivePipeline>,
}

impl RealSenseBackend {
    /// Connect to librealsense; fails when no device is attached
    ///
    /// With `serial` set only that device is opened, otherwise the first one.
    pub fn new(serial: Option<String>) -> BackendResult<Self> {
        let context = Context::new().map_err(|e| CameraError::BackendUnavailable(e.to_string()))?;
        let devices = context.query_devices(HashSet::new());
        if devices.is_empty() {
            return Err(CameraError::NoDeviceFound);
        }
        if let Some(wanted) = &serial
            && !devices
                .iter()
                .any(|d| info_string(d, Rs2CameraInfo::SerialNumber).as_deref() == Some(wanted))
        {
            return Err(CameraError::NoDeviceFound);
        }
        Ok(Self {
            context,
            serial,
            pipeline: None,
        })
    }

    fn build_config(&self, config: &StreamConfig) -> BackendResult<Config> {
        let unsupported = |e: &dyn std::fmt::Display| {
            CameraError::UnsupportedConfiguration(format!("{}: {}", config, e))
        };
        let mut rs_config = Config::new();
        if let Some(serial) = &self.serial {
            let serial = CString::new(serial.as_str())
                .map_err(|e| CameraError::InitializationFailed(e.to_string()))?;
            rs_config
                .enable_device_from_serial(&serial)
                .map_err(|e| unsupported(&e))?;
        }
        rs_config
            .disable_all_streams()
            .map_err(|e| unsupported(&e))?
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                config.width as usize,
                config.height as usize,
                Rs2Format::Z16,
                config.fps as usize,
            )
            .map_err(|e| unsupported(&e))?
            .enable_stream(
                Rs2StreamKind::Color,
                None,
                config.width as usize,
                config.height as usize,
                Rs2Format::Rgb8,
                config.fps as usize,
            )
            .map_err(|e| unsupported(&e))?;
        Ok(rs_config)
    }

    fn read_calibration(pipeline: &mut ActivePipeline) -> BackendResult<StreamCalibration> {
        let unavailable =
            |e: &dyn std::fmt::Display| CameraError::CalibrationUnavailable(e.to_string());
        let streams = pipeline.profile().streams();
        let find = |kind| {
            streams
                .iter()
                .find(|s| s.kind() == kind)
                .ok_or_else(|| CameraError::CalibrationUnavailable(format!("no {:?} stream", kind)))
        };
        let depth_profile = find(Rs2StreamKind::Depth)?;
        let color_profile = find(Rs2StreamKind::Color)?;

        let depth_intr = intrinsics(&depth_profile.intrinsics().map_err(|e| unavailable(&e))?);
        let color_intr = intrinsics(&color_profile.intrinsics().map_err(|e| unavailable(&e))?);
        let extr = extrinsics(
            &depth_profile
                .extrinsics(color_profile)
                .map_err(|e| unavailable(&e))?,
        );

        let depth_scale = Self::first_depth_unit(pipeline);
        Ok(StreamCalibration {
            depth: depth_intr,
            color: color_intr,
            depth_to_color: extr,
            depth_scale,
        })
    }

    fn first_depth_unit(pipeline: &mut ActivePipeline) -> f32 {
        for _ in 0..WARMUP_ATTEMPTS {
            let Ok(frames) = pipeline.wait(Some(timing::FRAME_TIMEOUT)) else {
                continue;
            };
            if let Some(frame) = frames.frames_of_type::<DepthFrame>().first()
                && let Ok(units) = frame.depth_units()
            {
                return units;
            }
        }
        warn!(
            default = depth::DEFAULT_SCALE,
            "Depth unit not reported, assuming default"
        );
        depth::DEFAULT_SCALE
    }
}

fn intrinsics(intr: &Rs2Intrinsics) -> Intrinsics {
    Intrinsics {
        width: intr.width() as u32,
        height: intr.height() as u32,
        fx: intr.fx(),
        fy: intr.fy(),
        ppx: intr.ppx(),
        ppy: intr.ppy(),
    }
}

fn extrinsics(extr: &Rs2Extrinsics) -> Extrinsics {
    Extrinsics {
        rotation: extr.rotation(),
        translation: extr.translation(),
    }
}

fn depth_image(frame: &DepthFrame) -> Option<DepthImage> {
    let (width, height) = (frame.width(), frame.height());
    let mut out = DepthImage::new(width as u32, height as u32);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        match frame.get(x as usize, y as usize)? {
            PixelKind::Z16 { depth } => *pixel = Luma([*depth]),
            _ => return None,
        }
    }
    Some(out)
}

fn color_image(frame: &ColorFrame) -> Option<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let mut out = RgbImage::new(width as u32, height as u32);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        match frame.get(x as usize, y as usize)? {
            PixelKind::Rgb8 { r, g, b } => *pixel = Rgb([*r, *g, *b]),
            _ => return None,
        }
    }
    Some(out)
}

impl CameraBackend for RealSenseBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::RealSense
    }

    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration> {
        let rs_config = self.build_config(config)?;
        let inactive = InactivePipeline::try_from(&self.context)
            .map_err(|e| CameraError::InitializationFailed(e.to_string()))?;
        let pipeline = inactive
            .start(Some(rs_config))
            .map_err(|e| CameraError::UnsupportedConfiguration(format!("{}: {}", config, e)))?;
        let pipeline = self.pipeline.insert(pipeline);

        let calibration = Self::read_calibration(pipeline)?;
        info!(
            serial = self.serial.as_deref().unwrap_or("first"),
            depth_scale = calibration.depth_scale,
            "RealSense streaming"
        );
        Ok(calibration)
    }

    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
        let pipeline = self.pipeline.as_mut().ok_or(CameraError::NotStreaming)?;
        let frames = pipeline
            .wait(Some(timing::FRAME_TIMEOUT))
            .map_err(|e| CameraError::FrameWaitFailed(e.to_string()))?;

        let depth_frames = frames.frames_of_type::<DepthFrame>();
        let color_frames = frames.frames_of_type::<ColorFrame>();
        let frame_number = depth_frames
            .first()
            .map(|f| f.frame_number())
            .unwrap_or_default();

        Ok(FrameBundle {
            frame_number,
            depth: depth_frames.first().and_then(depth_image),
            color: color_frames.first().and_then(color_image),
        })
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _inactive: InactivePipeline = pipeline.stop();
            debug!("RealSense pipeline stopped");
        }
    }
}
