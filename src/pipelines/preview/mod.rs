// SPDX-License-Identifier: GPL-3.0-only

//! Display-side image helpers
//!
//! Everything here produces preview pixels only. Saved frames are written
//! from the unmodified color image and aligned depth.

mod colormap;
mod compose;
mod label;

pub use colormap::Colorizer;
pub use compose::{compose_horizontal, fit_panel};
pub use label::{draw_text, label};
