// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing between the device and the screen or disk
//!
//! - [`align`]: reproject depth onto the color grid
//! - [`preview`]: colorize, label and compose images for display

pub mod align;
pub mod preview;

pub use align::{AlignedFrames, align_to_color};
