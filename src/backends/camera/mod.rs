// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │    Capture Loop     │
//! └──────────┬──────────┘
//!            │ poll()
//!            ▼
//! ┌─────────────────────┐
//! │    DeviceSession    │  ← Owns the backend, releases it exactly once
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!     ┌──────┼──────────┐
//!     ▼      ▼          ▼
//! RealSense Synthetic  Replay
//! ```

#[cfg(feature = "realsense")]
pub mod realsense;
pub mod replay;
pub mod synthetic;
pub mod types;

pub use types::*;

use crate::config::CaptureConfig;
use crate::errors::{BackendResult, CameraError};
use crate::storage::DatasetLayout;
use tracing::{debug, info, warn};

/// Hardware-facing half of a device session
///
/// Backends deliver depth in raw 16-bit units and color as RGB8. A backend
/// must tolerate `stop` being called when `start` failed part way.
pub trait CameraBackend {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Configure the depth and color streams and start acquisition
    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration>;

    /// Block until the next bundle is available
    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle>;

    /// Stop acquisition and release the device
    fn stop(&mut self);
}

impl<B: CameraBackend + ?Sized> CameraBackend for Box<B> {
    fn backend_type(&self) -> CameraBackendType {
        (**self).backend_type()
    }

    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration> {
        (**self).start(config)
    }

    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
        (**self).wait_for_frames()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// A started camera with guaranteed release
///
/// The backend is stopped by [`DeviceSession::close`] or, on any other exit
/// path, when the session is dropped. It is never stopped twice.
pub struct DeviceSession<B: CameraBackend> {
    backend: B,
    calibration: StreamCalibration,
    streaming: bool,
}

impl<B: CameraBackend> DeviceSession<B> {
    /// Start `backend` with the requested streams
    pub fn open(mut backend: B, config: StreamConfig) -> BackendResult<Self> {
        info!(backend = %backend.backend_type(), config = %config, "Opening camera session");
        match backend.start(&config) {
            Ok(calibration) => {
                debug!(?calibration, "Camera session started");
                Ok(Self {
                    backend,
                    calibration,
                    streaming: true,
                })
            }
            Err(e) => {
                warn!(error = %e, "Camera failed to start, releasing");
                backend.stop();
                Err(e)
            }
        }
    }

    /// Wait for the next frame bundle
    pub fn poll(&mut self) -> BackendResult<FrameBundle> {
        if !self.streaming {
            return Err(CameraError::NotStreaming);
        }
        self.backend.wait_for_frames()
    }

    pub fn calibration(&self) -> &StreamCalibration {
        &self.calibration
    }

    /// Stop streaming and release the device
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.streaming {
            self.streaming = false;
            self.backend.stop();
            info!(backend = %self.backend.backend_type(), "Camera released");
        }
    }
}

impl<B: CameraBackend> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build the backend selected in `config`
pub fn create_backend(config: &CaptureConfig) -> BackendResult<Box<dyn CameraBackend>> {
    match config.backend {
        CameraBackendType::RealSense => create_realsense(config.device_serial.clone()),
        CameraBackendType::Synthetic => Ok(Box::new(synthetic::SyntheticBackend::new())),
        CameraBackendType::Replay => {
            let layout = DatasetLayout::new(
                config.replay_rgb_root(),
                config.replay_depth_root(),
                &config.scene,
            );
            Ok(Box::new(replay::ReplayBackend::new(layout)))
        }
    }
}

#[cfg(feature = "realsense")]
fn create_realsense(serial: Option<String>) -> BackendResult<Box<dyn CameraBackend>> {
    Ok(Box::new(realsense::RealSenseBackend::new(serial)?))
}

#[cfg(not(feature = "realsense"))]
fn create_realsense(_serial: Option<String>) -> BackendResult<Box<dyn CameraBackend>> {
    Err(CameraError::BackendUnavailable(
        "built without the `realsense` feature".to_string(),
    ))
}

/// Enumerate the devices a backend can open
pub fn enumerate_devices(backend: CameraBackendType) -> BackendResult<Vec<CameraDevice>> {
    match backend {
        #[cfg(feature = "realsense")]
        CameraBackendType::RealSense => realsense::enumerate_devices(),
        #[cfg(not(feature = "realsense"))]
        CameraBackendType::RealSense => Err(CameraError::BackendUnavailable(
            "built without the `realsense` feature".to_string(),
        )),
        CameraBackendType::Synthetic => Ok(vec![synthetic::device()]),
        CameraBackendType::Replay => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingBackend {
        stops: Rc<Cell<usize>>,
        fail_start: bool,
    }

    impl CameraBackend for CountingBackend {
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::Synthetic
        }

        fn start(&mut self, _config: &StreamConfig) -> BackendResult<StreamCalibration> {
            if self.fail_start {
                return Err(CameraError::NoDeviceFound);
            }
            Ok(synthetic::calibration(&StreamConfig::default()))
        }

        fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
            Err(CameraError::FrameWaitFailed("no frames".into()))
        }

        fn stop(&mut self) {
            self.stops.set(self.stops.get() + 1);
        }
    }

    #[test]
    fn test_close_then_drop_releases_once() {
        let stops = Rc::new(Cell::new(0));
        let backend = CountingBackend {
            stops: stops.clone(),
            fail_start: false,
        };
        let session = DeviceSession::open(backend, StreamConfig::default()).unwrap();
        session.close();
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let stops = Rc::new(Cell::new(0));
        {
            let backend = CountingBackend {
                stops: stops.clone(),
                fail_start: false,
            };
            let _session = DeviceSession::open(backend, StreamConfig::default()).unwrap();
        }
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_failed_start_releases_partial_state() {
        let stops = Rc::new(Cell::new(0));
        let backend = CountingBackend {
            stops: stops.clone(),
            fail_start: true,
        };
        assert!(DeviceSession::open(backend, StreamConfig::default()).is_err());
        assert_eq!(stops.get(), 1);
    }

    #[cfg(not(feature = "realsense"))]
    #[test]
    fn test_realsense_unavailable_without_feature() {
        let config = CaptureConfig {
            backend: CameraBackendType::RealSense,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            create_backend(&config),
            Err(CameraError::BackendUnavailable(_))
        ));
    }
}
