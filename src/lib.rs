// SPDX-License-Identifier: GPL-3.0-only

//! Depth Capture - stream, align and collect RGB-D frame pairs
//!
//! Opens a depth camera, aligns every depth frame to the color camera's
//! viewpoint and shows both side by side in the terminal. In collection
//! mode a key press saves the color image and the aligned 16-bit depth
//! as a numbered pair of PNG files.
//!
//! # Architecture
//!
//! - [`backends`]: Camera backends and the device session that owns them
//! - [`pipelines`]: Depth-to-color alignment and preview composition
//! - [`capture_loop`]: Poll, show, save, quit
//! - [`storage`]: Dataset layout, numbering and PNG persistence
//! - [`input`]: Keyboard and signal events
//! - [`terminal`]: Half-block terminal preview
//! - [`config`]: Run configuration

pub mod backends;
pub mod capture_loop;
pub mod config;
pub mod constants;
pub mod errors;
pub mod input;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use capture_loop::{
    CaptureLoop, ExitReason, LoopFailure, LoopReport, LoopState, PreviewSurface,
};
pub use config::{CaptureConfig, CaptureMode, ColorScheme, ColorizerSettings, OverwritePolicy};
pub use errors::{AppError, AppResult};
