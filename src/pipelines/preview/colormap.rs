// SPDX-License-Identifier: GPL-3.0-only

//! Depth colorization
//!
//! Provides functions for converting depth data to viewable formats:
//! - Jet colormap (blue=near, red=far)
//! - Turbo colormap (blue=near, red=far)
//! - Grayscale (bright=near, dark=far)
//!
//! Colors are for display only; saved depth is never touched.

use image::{Rgb, RgbImage};

use crate::backends::camera::DepthImage;
use crate::config::{ColorScheme, ColorizerSettings};
use crate::constants::depth::INVALID;

/// Jet control points, near to far
const JET_STOPS: [[f32; 3]; 5] = [
    [0.0, 0.0, 255.0],
    [0.0, 255.0, 255.0],
    [255.0, 255.0, 0.0],
    [255.0, 0.0, 0.0],
    [50.0, 0.0, 0.0],
];

#[inline]
fn jet(t: f32) -> [u8; 3] {
    let segments = (JET_STOPS.len() - 1) as f32;
    let pos = t.clamp(0.0, 1.0) * segments;
    let i = (pos.floor() as usize).min(JET_STOPS.len() - 2);
    let f = pos - i as f32;
    let (a, b) = (JET_STOPS[i], JET_STOPS[i + 1]);
    [
        (a[0] + (b[0] - a[0]) * f) as u8,
        (a[1] + (b[1] - a[1]) * f) as u8,
        (a[2] + (b[2] - a[2]) * f) as u8,
    ]
}

/// Turbo colormap: perceptually uniform rainbow (blue=near, red=far)
///
/// Based on: https://ai.googleblog.com/2019/08/turbo-improved-rainbow-colormap-for.html
/// Simplified version with polynomial approximation.
#[inline]
fn turbo(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let r = (0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144)))))
        .clamp(0.0, 1.0);
    let g = (0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377)))))
        .clamp(0.0, 1.0);
    let b = (0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388)))))
        .clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

#[inline]
fn grayscale(t: f32) -> [u8; 3] {
    let gray = ((1.0 - t.clamp(0.0, 1.0)) * 255.0) as u8;
    [gray, gray, gray]
}

/// Maps raw depth to colors
#[derive(Debug, Clone, Copy)]
pub struct Colorizer {
    settings: ColorizerSettings,
    /// Meters per depth unit
    depth_scale: f32,
}

impl Colorizer {
    pub fn new(settings: ColorizerSettings, depth_scale: f32) -> Self {
        Self {
            settings,
            depth_scale,
        }
    }

    fn color(&self, t: f32) -> [u8; 3] {
        match self.settings.scheme {
            ColorScheme::Jet => jet(t),
            ColorScheme::Turbo => turbo(t),
            ColorScheme::Grayscale => grayscale(t),
        }
    }

    /// Colorize a depth grid; pixels with no data are black
    pub fn colorize(&self, depth: &DepthImage) -> RgbImage {
        if self.settings.equalize {
            self.colorize_equalized(depth)
        } else {
            self.colorize_linear(depth)
        }
    }

    fn colorize_linear(&self, depth: &DepthImage) -> RgbImage {
        let min = self.settings.min_meters;
        let span = (self.settings.max_meters - min).max(f32::EPSILON);
        RgbImage::from_fn(depth.width(), depth.height(), |x, y| {
            let raw = depth.get_pixel(x, y)[0];
            if raw == INVALID {
                return Rgb([0, 0, 0]);
            }
            let t = (raw as f32 * self.depth_scale - min) / span;
            Rgb(self.color(t))
        })
    }

    /// Spread colors by the cumulative histogram of this frame's depths
    fn colorize_equalized(&self, depth: &DepthImage) -> RgbImage {
        let mut cumulative = vec![0u32; u16::MAX as usize + 1];
        for p in depth.pixels() {
            if p[0] != INVALID {
                cumulative[p[0] as usize] += 1;
            }
        }
        for i in 1..cumulative.len() {
            cumulative[i] += cumulative[i - 1];
        }
        let total = cumulative[u16::MAX as usize].max(1) as f32;

        RgbImage::from_fn(depth.width(), depth.height(), |x, y| {
            let raw = depth.get_pixel(x, y)[0];
            if raw == INVALID {
                return Rgb([0, 0, 0]);
            }
            Rgb(self.color(cumulative[raw as usize] as f32 / total))
        })
    }
}
