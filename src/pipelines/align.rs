// SPDX-License-Identifier: GPL-3.0-only

//! Depth-to-color alignment
//!
//! Every valid depth pixel is treated as a small square: its two opposite
//! corners are deprojected at the pixel's depth, moved into the color
//! camera's frame and projected onto the color grid. The color pixels the
//! square covers receive the raw depth sample. When several depth pixels
//! cover the same color pixel the nearest one wins, so foreground edges
//! occlude the background behind them.

use image::{Luma, RgbImage};
use nalgebra::{Matrix3, Vector3};

use crate::backends::camera::{DepthImage, RgbdFrames, StreamCalibration};
use crate::constants::depth::INVALID;

/// A complete bundle plus its depth resampled onto the color grid
pub struct AlignedFrames<'a> {
    pub frames: &'a RgbdFrames,
    /// Same dimensions as the color image; 0 where nothing projected
    pub depth: DepthImage,
}

impl AlignedFrames<'_> {
    pub fn color(&self) -> &RgbImage {
        &self.frames.color
    }

    /// Depth as the sensor delivered it, before alignment
    pub fn original_depth(&self) -> &DepthImage {
        &self.frames.depth
    }
}

/// Align a bundle's depth to its color stream
pub fn align_to_color<'a>(
    frames: &'a RgbdFrames,
    calibration: &StreamCalibration,
) -> AlignedFrames<'a> {
    let depth = align_depth_to_color(
        &frames.depth,
        frames.color.width(),
        frames.color.height(),
        calibration,
    );
    AlignedFrames { frames, depth }
}

/// Resample `depth` into a `color_width` x `color_height` grid
pub fn align_depth_to_color(
    depth: &DepthImage,
    color_width: u32,
    color_height: u32,
    calibration: &StreamCalibration,
) -> DepthImage {
    let mut out = DepthImage::new(color_width, color_height);
    if color_width == 0 || color_height == 0 {
        return out;
    }

    // Intrinsics describe the sensor; match them to the frames we got
    let d_intr = calibration.depth.scaled_to(depth.width(), depth.height());
    let c_intr = calibration.color.scaled_to(color_width, color_height);
    let rotation = Matrix3::from_column_slice(&calibration.depth_to_color.rotation);
    let translation = Vector3::from(calibration.depth_to_color.translation);
    let scale = calibration.depth_scale;

    let to_color_pixel = |px: f32, py: f32, z: f32| -> Option<(f32, f32)> {
        let p_d = Vector3::from(d_intr.deproject(px, py, z));
        let p_c = rotation * p_d + translation;
        (p_c.z > 0.0).then(|| c_intr.project([p_c.x, p_c.y, p_c.z]))
    };

    let (w, h) = (color_width as i64, color_height as i64);
    for (u, v, &Luma([raw])) in depth.enumerate_pixels() {
        if raw == INVALID {
            continue;
        }
        let z = raw as f32 * scale;
        let (u, v) = (u as f32, v as f32);
        let (Some(a), Some(b)) = (
            to_color_pixel(u - 0.5, v - 0.5, z),
            to_color_pixel(u + 0.5, v + 0.5, z),
        ) else {
            continue;
        };

        // Half-open span of color pixels whose centers the square covers
        let (x0, x1) = pixel_span(a.0, b.0);
        let (y0, y1) = pixel_span(a.1, b.1);
        if x1 <= 0 || y1 <= 0 || x0 >= w || y0 >= h {
            continue;
        }

        for y in y0.max(0)..y1.min(h) {
            for x in x0.max(0)..x1.min(w) {
                let cell = out.get_pixel_mut(x as u32, y as u32);
                if cell[0] == INVALID || raw < cell[0] {
                    cell[0] = raw;
                }
            }
        }
    }
    out
}

/// Pixels whose centers lie in `[lo, hi)`, at least one
fn pixel_span(a: f32, b: f32) -> (i64, i64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let start = lo.ceil() as i64;
    let end = (hi.ceil() as i64).max(start + 1);
    (start, end)
}
