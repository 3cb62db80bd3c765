// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture tool

use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for camera backend operations
pub type BackendResult<T> = Result<T, CameraError>;

/// Main application error type
#[derive(Debug)]
pub enum AppError {
    /// Camera/device errors
    Camera(CameraError),
    /// Dataset write errors
    Persist(PersistError),
    /// Preview composition errors
    Visualization(VisualizationError),
    /// Invalid configuration
    Config(String),
    /// Terminal setup or rendering failed
    Terminal(std::io::Error),
}

/// Camera-specific errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No compatible device found
    NoDeviceFound,
    /// Backend was not compiled into this binary
    BackendUnavailable(String),
    /// Requested stream configuration is not supported
    UnsupportedConfiguration(String),
    /// Device open / stream start failed
    InitializationFailed(String),
    /// Waiting for the next frame bundle failed
    FrameWaitFailed(String),
    /// Calibration data could not be read from the device
    CalibrationUnavailable(String),
    /// Polled before the session was started or after it was closed
    NotStreaming,
}

/// Errors raised while writing a frame pair
#[derive(Debug)]
pub enum PersistError {
    /// Creating a scene directory failed
    CreateDir { path: PathBuf, source: std::io::Error },
    /// Target exists and the overwrite policy forbids replacing it
    AlreadyExists(PathBuf),
    /// Encoding or writing an image failed
    Write { path: PathBuf, source: image::ImageError },
    /// Writing the calibration sidecar failed
    Sidecar { path: PathBuf, message: String },
    /// Scene label cannot be used as a directory name
    InvalidScene(String),
    /// The capture counter cannot advance past this index
    IndexExhausted(u32),
}

/// Preview composition errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualizationError {
    /// Nothing to compose
    NoImages,
    /// Horizontal composition needs equal heights
    HeightMismatch { expected: u32, found: u32, index: usize },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Persist(e) => write!(f, "Save error: {}", e),
            AppError::Visualization(e) => write!(f, "Preview error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Terminal(e) => write!(f, "Terminal error: {}", e),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDeviceFound => write!(f, "No compatible depth camera found"),
            CameraError::BackendUnavailable(msg) => write!(f, "Backend not available: {}", msg),
            CameraError::UnsupportedConfiguration(msg) => {
                write!(f, "Stream configuration not supported: {}", msg)
            }
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::FrameWaitFailed(msg) => write!(f, "Failed to wait for frames: {}", msg),
            CameraError::CalibrationUnavailable(msg) => {
                write!(f, "Calibration unavailable: {}", msg)
            }
            CameraError::NotStreaming => write!(f, "Camera is not streaming"),
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::CreateDir { path, source } => {
                write!(f, "Failed to create {}: {}", path.display(), source)
            }
            PersistError::AlreadyExists(path) => {
                write!(f, "Refusing to overwrite {}", path.display())
            }
            PersistError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            PersistError::Sidecar { path, message } => {
                write!(f, "Failed to write {}: {}", path.display(), message)
            }
            PersistError::InvalidScene(label) => write!(f, "Invalid scene label: {:?}", label),
            PersistError::IndexExhausted(index) => {
                write!(f, "No capture index left after {}", index)
            }
        }
    }
}

impl fmt::Display for VisualizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualizationError::NoImages => write!(f, "No images to compose"),
            VisualizationError::HeightMismatch {
                expected,
                found,
                index,
            } => write!(
                f,
                "Image {} has height {} but the canvas height is {}",
                index, found, expected
            ),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Camera(e) => Some(e),
            AppError::Persist(e) => Some(e),
            AppError::Visualization(e) => Some(e),
            AppError::Terminal(e) => Some(e),
            AppError::Config(_) => None,
        }
    }
}

impl std::error::Error for CameraError {}
impl std::error::Error for VisualizationError {}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::CreateDir { source, .. } => Some(source),
            PersistError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<PersistError> for AppError {
    fn from(err: PersistError) -> Self {
        AppError::Persist(err)
    }
}

impl From<VisualizationError> for AppError {
    fn from(err: VisualizationError) -> Self {
        AppError::Visualization(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Terminal(err)
    }
}
