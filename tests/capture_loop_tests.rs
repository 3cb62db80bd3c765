// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture loop, driven by scripted input

use std::cell::Cell;
use std::rc::Rc;

use depth_capture::backends::camera::synthetic::SyntheticBackend;
use depth_capture::backends::camera::{
    CameraBackend, CameraBackendType, DeviceSession, FrameBundle, StreamCalibration, StreamConfig,
};
use depth_capture::capture_loop::{CaptureLoop, ExitReason, PreviewSurface};
use depth_capture::config::{ColorizerSettings, OverwritePolicy};
use depth_capture::constants::preview;
use depth_capture::errors::{AppError, AppResult, BackendResult, CameraError};
use depth_capture::input::{InputEvent, ScriptedInput};
use depth_capture::pipelines::preview::Colorizer;
use depth_capture::storage::{DatasetLayout, DatasetWriter};
use image::RgbImage;

const SMALL: StreamConfig = StreamConfig {
    width: 32,
    height: 24,
    fps: 30,
};

#[derive(Default)]
struct RecordingSurface {
    titles: Vec<String>,
    sizes: Vec<(u32, u32)>,
    statuses: Vec<String>,
}

impl PreviewSurface for RecordingSurface {
    fn present(&mut self, title: &str, canvas: &RgbImage, status: &str) -> AppResult<()> {
        self.titles.push(title.to_string());
        self.sizes.push(canvas.dimensions());
        self.statuses.push(status.to_string());
        Ok(())
    }
}

/// Synthetic frames, a stop counter, and an optional poll failure
struct ScriptedBackend {
    inner: SyntheticBackend,
    stops: Rc<Cell<usize>>,
    fail_on_poll: Option<u64>,
    polls: u64,
}

impl ScriptedBackend {
    fn new(inner: SyntheticBackend, stops: &Rc<Cell<usize>>) -> Self {
        Self {
            inner,
            stops: stops.clone(),
            fail_on_poll: None,
            polls: 0,
        }
    }
}

impl CameraBackend for ScriptedBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    fn start(&mut self, config: &StreamConfig) -> BackendResult<StreamCalibration> {
        self.inner.start(config)
    }

    fn wait_for_frames(&mut self) -> BackendResult<FrameBundle> {
        self.polls += 1;
        if self.fail_on_poll == Some(self.polls) {
            return Err(CameraError::FrameWaitFailed("device unplugged".into()));
        }
        self.inner.wait_for_frames()
    }

    fn stop(&mut self) {
        self.stops.set(self.stops.get() + 1);
        self.inner.stop();
    }
}

fn colorizer() -> Colorizer {
    Colorizer::new(ColorizerSettings::default(), 0.001)
}

fn collect_writer(root: &std::path::Path, policy: OverwritePolicy) -> DatasetWriter {
    let writer = DatasetWriter::new(DatasetLayout::under_root(root, "scene_1"), policy);
    writer.prepare().unwrap();
    writer
}

#[test]
fn test_collect_saves_on_space_and_quits_on_esc() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = collect_writer(tmp.path(), OverwritePolicy::Resume);
    let state = writer.initial_state().unwrap();
    let stops = Rc::new(Cell::new(0));
    let session =
        DeviceSession::open(ScriptedBackend::new(SyntheticBackend::unpaced(), &stops), SMALL).unwrap();

    let input = ScriptedInput::new([
        Some(InputEvent::Save),
        None,
        Some(InputEvent::Other),
        Some(InputEvent::Save),
        Some(InputEvent::Quit),
    ]);
    let mut surface = RecordingSurface::default();
    let report = CaptureLoop::collect(input, &mut surface, colorizer(), writer, state)
        .run(session)
        .unwrap();

    assert_eq!(report.exit, ExitReason::Quit);
    assert_eq!(report.frames_presented, 5);
    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.saved[0].index, 1);
    assert_eq!(report.saved[1].index, 2);
    assert_eq!(report.final_state.map(|s| s.next_index), Some(3));
    assert_eq!(stops.get(), 1);

    let layout = DatasetLayout::under_root(tmp.path(), "scene_1");
    for index in [1, 2] {
        let depth = image::open(layout.depth_path(index)).unwrap();
        assert!(matches!(depth, image::DynamicImage::ImageLuma16(_)));
        assert_eq!(depth.into_luma16().dimensions(), (32, 24));
        assert!(layout.color_path(index).exists());
    }

    // Three labeled panels side by side
    assert!(surface.sizes.iter().all(|&size| size == (96, 24)));
    assert!(surface.titles.iter().all(|t| t == preview::COLLECT_TITLE));
    assert!(surface.statuses[1].contains("Saved scene 1"));
}

#[test]
fn test_incomplete_bundles_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = collect_writer(tmp.path(), OverwritePolicy::Overwrite);
    let stops = Rc::new(Cell::new(0));
    // Every second bundle arrives without color
    let backend = ScriptedBackend::new(SyntheticBackend::unpaced().with_dropped_color_every(2), &stops);
    let session = DeviceSession::open(backend, SMALL).unwrap();

    let input = ScriptedInput::new([
        Some(InputEvent::Save),
        Some(InputEvent::Save),
        Some(InputEvent::Quit),
    ]);
    let mut surface = RecordingSurface::default();
    let report = CaptureLoop::collect(input, &mut surface, colorizer(), writer, Default::default())
        .run(session)
        .unwrap();

    // Bundles 2 and 4 were skipped without display, input or save
    assert_eq!(report.frames_presented, 3);
    assert_eq!(report.bundles_skipped, 2);
    assert_eq!(surface.sizes.len(), 3);
    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.final_state.map(|s| s.next_index), Some(3));
}

#[test]
fn test_failed_save_keeps_counter_and_loop_running() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = collect_writer(tmp.path(), OverwritePolicy::Refuse);
    std::fs::write(writer.layout().color_path(1), b"earlier run").unwrap();
    let state = writer.initial_state().unwrap();
    let stops = Rc::new(Cell::new(0));
    let session =
        DeviceSession::open(ScriptedBackend::new(SyntheticBackend::unpaced(), &stops), SMALL).unwrap();

    let input = ScriptedInput::new([Some(InputEvent::Save), None, Some(InputEvent::Quit)]);
    let mut surface = RecordingSurface::default();
    let report = CaptureLoop::collect(input, &mut surface, colorizer(), writer, state)
        .run(session)
        .unwrap();

    assert_eq!(report.exit, ExitReason::Quit);
    assert!(report.saved.is_empty());
    assert_eq!(report.failed_saves, 1);
    assert_eq!(report.final_state.map(|s| s.next_index), Some(1));
    assert_eq!(report.frames_presented, 3);
    assert!(surface.statuses[1].contains("Save failed"));
    assert_eq!(stops.get(), 1);
}

#[test]
fn test_poll_failure_releases_device_once() {
    let stops = Rc::new(Cell::new(0));
    let mut backend = ScriptedBackend::new(SyntheticBackend::unpaced(), &stops);
    backend.fail_on_poll = Some(3);
    let session = DeviceSession::open(backend, SMALL).unwrap();

    let input = ScriptedInput::new([None; 10]);
    let mut surface = RecordingSurface::default();
    let failure = CaptureLoop::stream(input, &mut surface, colorizer())
        .run(session)
        .unwrap_err();

    assert!(matches!(
        failure.error,
        AppError::Camera(CameraError::FrameWaitFailed(_))
    ));
    assert_eq!(failure.report.exit, ExitReason::Failed);
    assert_eq!(failure.report.frames_presented, 2);
    assert_eq!(surface.sizes.len(), 2);
    assert_eq!(stops.get(), 1);
}

#[test]
fn test_poll_failure_still_reports_saved_pairs() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = collect_writer(tmp.path(), OverwritePolicy::Resume);
    let state = writer.initial_state().unwrap();
    let stops = Rc::new(Cell::new(0));
    let mut backend = ScriptedBackend::new(SyntheticBackend::unpaced(), &stops);
    backend.fail_on_poll = Some(3);
    let session = DeviceSession::open(backend, SMALL).unwrap();

    let input = ScriptedInput::new([Some(InputEvent::Save), None, None]);
    let mut surface = RecordingSurface::default();
    let failure = CaptureLoop::collect(input, &mut surface, colorizer(), writer, state)
        .run(session)
        .unwrap_err();

    assert!(matches!(
        failure.error,
        AppError::Camera(CameraError::FrameWaitFailed(_))
    ));
    let report = failure.report;
    assert_eq!(report.exit, ExitReason::Failed);
    assert_eq!(report.saved.len(), 1);
    assert_eq!(report.saved[0].index, 1);
    assert!(report.saved[0].depth_path.exists());
    assert_eq!(report.final_state.map(|s| s.next_index), Some(2));
    assert_eq!(stops.get(), 1);
}

#[test]
fn test_stream_mode_ignores_save() {
    let stops = Rc::new(Cell::new(0));
    let session =
        DeviceSession::open(ScriptedBackend::new(SyntheticBackend::unpaced(), &stops), SMALL).unwrap();
    let input = ScriptedInput::new([Some(InputEvent::Save), Some(InputEvent::Interrupt)]);
    let mut surface = RecordingSurface::default();
    let report = CaptureLoop::stream(input, &mut surface, colorizer())
        .run(session)
        .unwrap();

    assert_eq!(report.exit, ExitReason::Interrupted);
    assert!(report.saved.is_empty());
    assert_eq!(report.final_state, None);
    assert!(surface.titles.iter().all(|t| t == preview::STREAM_TITLE));
    assert!(surface.sizes.iter().all(|&size| size == (64, 24)));
    assert_eq!(stops.get(), 1);
}
