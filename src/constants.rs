// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Default stream parameters shared by the depth and color streams
pub mod stream {
    pub const WIDTH: u32 = 640;
    pub const HEIGHT: u32 = 480;
    pub const FPS: u32 = 30;
}

/// Capture loop timing
pub mod timing {
    use super::Duration;

    /// How long one iteration waits for a keypress
    pub const INPUT_WAIT: Duration = Duration::from_millis(1);
    /// How long a backend may block waiting for one bundle before failing
    pub const FRAME_TIMEOUT: Duration = Duration::from_millis(5000);
}

/// Dataset layout and naming
pub mod dataset {
    pub const DEFAULT_ROOT: &str = "../self_collected_dataset";
    pub const DEFAULT_SCENE: &str = "scene_1";
    pub const RGB_DIR: &str = "rgb";
    pub const DEPTH_DIR: &str = "depth";
    pub const STEM_PREFIX: &str = "image_";
    /// Minimum number of digits in the zero-padded index
    pub const INDEX_WIDTH: usize = 4;
    pub const COLOR_EXTENSION: &str = "png";
    pub const DEPTH_EXTENSION: &str = "png";
    pub const CALIBRATION_FILE: &str = "calibration.json";
    /// First index of a fresh capture session
    pub const FIRST_INDEX: u32 = 1;
}

/// Depth visualization defaults
pub mod depth {
    /// Lower bound of the linear colormap range (meters)
    pub const MIN_METERS: f32 = 0.3;
    /// Upper bound of the linear colormap range (meters)
    pub const MAX_METERS: f32 = 4.0;
    /// Depth value marking "no measurement"
    pub const INVALID: u16 = 0;
    /// Meters per depth unit when the device does not say otherwise
    pub const DEFAULT_SCALE: f32 = 0.001;
}

/// Preview titles and panel labels
pub mod preview {
    pub const STREAM_TITLE: &str = "Color (left) | Depth Colormap (right)";
    pub const COLLECT_TITLE: &str = "RealSense Streams";
    pub const LABEL_ALIGNED_DEPTH: &str = "Aligned Depth";
    pub const LABEL_ALIGNED_RGB: &str = "Aligned RGB";
    pub const LABEL_ORIGINAL_DEPTH: &str = "Original Depth";
    /// Top-left corner of label text
    pub const LABEL_ORIGIN: (u32, u32) = (10, 14);
    /// Each font pixel is drawn as a square of this size
    pub const LABEL_SCALE: u32 = 2;
}
