// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for depth camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Capture Loop                  │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌───────────┐ ┌───────────┐ ┌──────────┐   │
//! │  │ RealSense │ │ Synthetic │ │  Replay  │   │
//! │  └───────────┘ └───────────┘ └──────────┘   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
