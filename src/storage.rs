// SPDX-License-Identifier: GPL-3.0-only

//! Dataset storage for captured frame pairs
//!
//! A scene is written to two parallel trees that share file names:
//!
//! ```text
//! <rgb_root>/<scene>/image_0001.png     8-bit RGB
//! <depth_root>/<scene>/image_0001.png   16-bit grayscale, raw depth units
//! <depth_root>/<scene>/calibration.json
//! ```

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backends::camera::{DepthImage, StreamCalibration};
use crate::config::OverwritePolicy;
use crate::constants::dataset;
use crate::errors::PersistError;

/// Reject labels that would escape or collapse the scene directory
pub fn validate_scene_label(label: &str) -> Result<(), PersistError> {
    let bad = label.is_empty()
        || label == "."
        || label == ".."
        || label.contains(['/', '\\'])
        || label.contains('\0');
    if bad {
        return Err(PersistError::InvalidScene(label.to_string()));
    }
    Ok(())
}

/// Shared file stem for index `index`, e.g. `image_0007`
pub fn file_stem(index: u32) -> String {
    format!(
        "{}{:0width$}",
        dataset::STEM_PREFIX,
        index,
        width = dataset::INDEX_WIDTH
    )
}

/// Index encoded in an `image_NNNN.<ext>` file name
pub fn parse_index(file_name: &str) -> Option<u32> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let digits = stem.strip_prefix(dataset::STEM_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Where one scene's files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    scene: String,
    rgb_dir: PathBuf,
    depth_dir: PathBuf,
}

impl DatasetLayout {
    pub fn new(rgb_root: impl AsRef<Path>, depth_root: impl AsRef<Path>, scene: &str) -> Self {
        Self {
            scene: scene.to_string(),
            rgb_dir: rgb_root.as_ref().join(scene),
            depth_dir: depth_root.as_ref().join(scene),
        }
    }

    /// `<root>/rgb/<scene>` and `<root>/depth/<scene>`
    pub fn under_root(root: impl AsRef<Path>, scene: &str) -> Self {
        let root = root.as_ref();
        Self::new(
            root.join(dataset::RGB_DIR),
            root.join(dataset::DEPTH_DIR),
            scene,
        )
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn rgb_dir(&self) -> &Path {
        &self.rgb_dir
    }

    pub fn depth_dir(&self) -> &Path {
        &self.depth_dir
    }

    pub fn color_path(&self, index: u32) -> PathBuf {
        self.rgb_dir
            .join(format!("{}.{}", file_stem(index), dataset::COLOR_EXTENSION))
    }

    pub fn depth_path(&self, index: u32) -> PathBuf {
        self.depth_dir
            .join(format!("{}.{}", file_stem(index), dataset::DEPTH_EXTENSION))
    }

    pub fn calibration_path(&self) -> PathBuf {
        self.depth_dir.join(dataset::CALIBRATION_FILE)
    }

    /// Create both scene directories if absent
    pub fn prepare(&self) -> Result<(), PersistError> {
        validate_scene_label(&self.scene)?;
        for dir in [&self.rgb_dir, &self.depth_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PersistError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        debug!(rgb = %self.rgb_dir.display(), depth = %self.depth_dir.display(), "Scene directories ready");
        Ok(())
    }

    /// Sorted indices of `image_NNNN` files found in either directory
    pub fn existing_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = [&self.rgb_dir, &self.depth_dir]
            .into_iter()
            .filter_map(|dir| std::fs::read_dir(dir).ok())
            .flat_map(|entries| entries.flatten())
            .filter_map(|entry| parse_index(&entry.file_name().to_string_lossy()))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Capture sequence counter
///
/// Lives for one process. A save takes the current state and hands back the
/// advanced one; a failed save leaves the caller's copy untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureState {
    pub next_index: u32,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::starting_at(dataset::FIRST_INDEX)
    }

    pub fn starting_at(next_index: u32) -> Self {
        Self { next_index }
    }

    /// The state after one more save, `None` once the index space is used up
    pub fn advanced(self) -> Option<Self> {
        self.next_index.checked_add(1).map(Self::starting_at)
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Paths written by one save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPair {
    pub index: u32,
    pub color_path: PathBuf,
    pub depth_path: PathBuf,
}

impl std::fmt::Display for SavedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Saved scene {} → {}, {}",
            self.index,
            self.color_path.display(),
            self.depth_path.display()
        )
    }
}

/// Write a color image and its aligned depth under `index`
///
/// Color is an 8-bit RGB PNG, depth a 16-bit single channel PNG holding
/// the raw device units.
pub fn save_frame_pair(
    layout: &DatasetLayout,
    index: u32,
    color: &RgbImage,
    depth: &DepthImage,
    policy: OverwritePolicy,
) -> Result<SavedPair, PersistError> {
    let color_path = layout.color_path(index);
    let depth_path = layout.depth_path(index);

    if policy == OverwritePolicy::Refuse {
        for path in [&color_path, &depth_path] {
            if path.exists() {
                return Err(PersistError::AlreadyExists(path.clone()));
            }
        }
    }

    color
        .save_with_format(&color_path, ImageFormat::Png)
        .map_err(|source| PersistError::Write {
            path: color_path.clone(),
            source,
        })?;
    if let Err(source) = depth.save_with_format(&depth_path, ImageFormat::Png) {
        // An unpaired color file would block a retry at this index
        if let Err(e) = std::fs::remove_file(&color_path) {
            warn!(path = %color_path.display(), error = %e, "Could not remove unpaired color image");
        }
        return Err(PersistError::Write {
            path: depth_path,
            source,
        });
    }

    Ok(SavedPair {
        index,
        color_path,
        depth_path,
    })
}

/// Calibration sidecar contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub scene: String,
    /// RFC 3339 local time the capture session started
    pub captured_at: String,
    pub calibration: StreamCalibration,
}

/// Read a scene's calibration sidecar, if there is a readable one
pub fn read_calibration(layout: &DatasetLayout) -> Option<CalibrationRecord> {
    let path = layout.calibration_path();
    let text = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&text) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable calibration file");
            None
        }
    }
}

/// Writes frame pairs for one scene under an overwrite policy
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    layout: DatasetLayout,
    policy: OverwritePolicy,
}

impl DatasetWriter {
    pub fn new(layout: DatasetLayout, policy: OverwritePolicy) -> Self {
        Self { layout, policy }
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Create the scene directories
    pub fn prepare(&self) -> Result<(), PersistError> {
        self.layout.prepare()
    }

    /// Counter state a new session starts from
    pub fn initial_state(&self) -> Result<CaptureState, PersistError> {
        match self.policy {
            OverwritePolicy::Resume => {
                let Some(&last) = self.layout.existing_indices().last() else {
                    return Ok(CaptureState::new());
                };
                let state = CaptureState::starting_at(last)
                    .advanced()
                    .ok_or(PersistError::IndexExhausted(last))?;
                info!(
                    scene = self.layout.scene(),
                    next_index = state.next_index,
                    "Resuming after existing captures"
                );
                Ok(state)
            }
            OverwritePolicy::Overwrite | OverwritePolicy::Refuse => Ok(CaptureState::new()),
        }
    }

    /// Save a pair at `state.next_index` and return the advanced state
    pub fn save(
        &self,
        state: CaptureState,
        color: &RgbImage,
        depth: &DepthImage,
    ) -> Result<(SavedPair, CaptureState), PersistError> {
        let next = state
            .advanced()
            .ok_or(PersistError::IndexExhausted(state.next_index))?;
        let saved = save_frame_pair(&self.layout, state.next_index, color, depth, self.policy)?;
        info!(
            index = saved.index,
            color = %saved.color_path.display(),
            depth = %saved.depth_path.display(),
            "Frame pair saved"
        );
        Ok((saved, next))
    }

    /// Record the stream calibration next to the depth images
    pub fn write_calibration(&self, calibration: &StreamCalibration) -> Result<PathBuf, PersistError> {
        let path = self.layout.calibration_path();
        let record = CalibrationRecord {
            scene: self.layout.scene().to_string(),
            captured_at: chrono::Local::now().to_rfc3339(),
            calibration: *calibration,
        };
        let json = serde_json::to_string_pretty(&record).map_err(|e| PersistError::Sidecar {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| PersistError::Sidecar {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Calibration written");
        Ok(path)
    }
}
