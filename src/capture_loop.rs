// SPDX-License-Identifier: GPL-3.0-only

//! The acquisition-and-capture loop
//!
//! ```text
//!   poll ──► complete? ──no──► (skip) ─┐
//!    ▲          │yes                   │
//!    │          ▼                      │
//!    │   align → colorize/label ──► present ──► input
//!    │                                           │
//!    └──────────── Save: write pair ◄────────────┤
//!                                     Quit ──► Terminated
//! ```
//!
//! The device session is closed on every way out of [`CaptureLoop::run`].

use image::RgbImage;
use tracing::{debug, error, info, trace};

use crate::backends::camera::{CameraBackend, DeviceSession};
use crate::constants::{preview, timing};
use crate::errors::{AppError, AppResult};
use crate::input::{InputEvent, InputSource};
use crate::pipelines::align::{AlignedFrames, align_to_color};
use crate::pipelines::preview::{Colorizer, compose_horizontal, fit_panel, label};
use crate::storage::{CaptureState, DatasetWriter, SavedPair};

/// Somewhere to show the composed preview
pub trait PreviewSurface {
    fn present(&mut self, title: &str, canvas: &RgbImage, status: &str) -> AppResult<()>;
}

impl<P: PreviewSurface + ?Sized> PreviewSurface for &mut P {
    fn present(&mut self, title: &str, canvas: &RgbImage, status: &str) -> AppResult<()> {
        (**self).present(title, canvas, status)
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The quit key was pressed
    Quit,
    /// Ctrl+C or a termination signal
    Interrupted,
    /// A fatal error, see [`LoopFailure`]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated(ExitReason),
}

/// What happened during one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub exit: ExitReason,
    pub saved: Vec<SavedPair>,
    pub failed_saves: u64,
    pub frames_presented: u64,
    pub bundles_skipped: u64,
    /// Counter after the last save, collection runs only
    pub final_state: Option<CaptureState>,
}

/// A fatal error together with what the run achieved before it
#[derive(Debug)]
pub struct LoopFailure {
    pub error: AppError,
    pub report: LoopReport,
}

enum LoopMode {
    Stream,
    Collect {
        writer: DatasetWriter,
        state: CaptureState,
    },
}

pub struct CaptureLoop<I: InputSource, P: PreviewSurface> {
    input: I,
    surface: P,
    colorizer: Colorizer,
    mode: LoopMode,
    message: Option<String>,
    saved: Vec<SavedPair>,
    failed_saves: u64,
    frames_presented: u64,
    bundles_skipped: u64,
}

impl<I: InputSource, P: PreviewSurface> CaptureLoop<I, P> {
    /// Preview only: color next to colorized aligned depth
    pub fn stream(input: I, surface: P, colorizer: Colorizer) -> Self {
        Self::with_mode(input, surface, colorizer, LoopMode::Stream)
    }

    /// Labeled three-panel preview that saves pairs on the save key
    ///
    /// `writer`'s directories must already exist.
    pub fn collect(
        input: I,
        surface: P,
        colorizer: Colorizer,
        writer: DatasetWriter,
        state: CaptureState,
    ) -> Self {
        Self::with_mode(
            input,
            surface,
            colorizer,
            LoopMode::Collect { writer, state },
        )
    }

    fn with_mode(input: I, surface: P, colorizer: Colorizer, mode: LoopMode) -> Self {
        Self {
            input,
            surface,
            colorizer,
            mode,
            message: None,
            saved: Vec::new(),
            failed_saves: 0,
            frames_presented: 0,
            bundles_skipped: 0,
        }
    }

    /// Run until quit, then close the session
    ///
    /// A fatal error ends the loop early. The session is released on that
    /// path too, and the failure still carries the pairs saved so far.
    pub fn run<B: CameraBackend>(
        mut self,
        mut session: DeviceSession<B>,
    ) -> Result<LoopReport, LoopFailure> {
        let outcome = self.run_until_terminated(&mut session);
        session.close();
        match outcome {
            Ok(exit) => Ok(self.into_report(exit)),
            Err(error) => {
                error!(error = %error, saved = self.saved.len(), "Capture loop failed");
                Err(LoopFailure {
                    error,
                    report: self.into_report(ExitReason::Failed),
                })
            }
        }
    }

    fn into_report(self, exit: ExitReason) -> LoopReport {
        let final_state = match &self.mode {
            LoopMode::Stream => None,
            LoopMode::Collect { state, .. } => Some(*state),
        };
        info!(
            ?exit,
            frames = self.frames_presented,
            skipped = self.bundles_skipped,
            saved = self.saved.len(),
            "Capture loop finished"
        );
        LoopReport {
            exit,
            saved: self.saved,
            failed_saves: self.failed_saves,
            frames_presented: self.frames_presented,
            bundles_skipped: self.bundles_skipped,
            final_state,
        }
    }

    fn run_until_terminated<B: CameraBackend>(
        &mut self,
        session: &mut DeviceSession<B>,
    ) -> AppResult<ExitReason> {
        loop {
            if let LoopState::Terminated(reason) = self.step(session)? {
                return Ok(reason);
            }
        }
    }

    /// One iteration: poll, show, react to input
    pub fn step<B: CameraBackend>(&mut self, session: &mut DeviceSession<B>) -> AppResult<LoopState> {
        let bundle = session.poll()?;
        let frame_number = bundle.frame_number;
        let Some(frames) = bundle.into_complete() else {
            self.bundles_skipped += 1;
            trace!(frame = frame_number, "Incomplete bundle skipped");
            return Ok(LoopState::Running);
        };

        let aligned = align_to_color(&frames, session.calibration());
        let canvas = self.render(&aligned)?;
        let status = self.status_line();
        self.surface.present(self.title(), &canvas, &status)?;
        self.frames_presented += 1;

        match self.input.next_event(timing::INPUT_WAIT)? {
            Some(InputEvent::Save) => self.save(&aligned),
            Some(InputEvent::Quit) => return Ok(LoopState::Terminated(ExitReason::Quit)),
            Some(InputEvent::Interrupt) => {
                return Ok(LoopState::Terminated(ExitReason::Interrupted));
            }
            Some(InputEvent::Other) | None => {}
        }
        Ok(LoopState::Running)
    }

    fn title(&self) -> &'static str {
        match self.mode {
            LoopMode::Stream => preview::STREAM_TITLE,
            LoopMode::Collect { .. } => preview::COLLECT_TITLE,
        }
    }

    fn status_line(&self) -> String {
        let help = match &self.mode {
            LoopMode::Stream => "Esc quit".to_string(),
            LoopMode::Collect { writer, state } => format!(
                "Space save | Esc quit | scene {} | next {}",
                writer.layout().scene(),
                state.next_index
            ),
        };
        match &self.message {
            Some(message) => format!("{} | {}", help, message),
            None => help,
        }
    }

    fn render(&self, aligned: &AlignedFrames<'_>) -> AppResult<RgbImage> {
        let color = aligned.color();
        let aligned_depth = self.colorizer.colorize(&aligned.depth);

        let canvas = match self.mode {
            LoopMode::Stream => compose_horizontal(&[color, &aligned_depth])?,
            LoopMode::Collect { .. } => {
                let original = fit_panel(
                    self.colorizer.colorize(aligned.original_depth()),
                    color.width(),
                    color.height(),
                );
                compose_horizontal(&[
                    &label(&aligned_depth, preview::LABEL_ALIGNED_DEPTH),
                    &label(color, preview::LABEL_ALIGNED_RGB),
                    &label(&original, preview::LABEL_ORIGINAL_DEPTH),
                ])?
            }
        };
        Ok(canvas)
    }

    fn save(&mut self, aligned: &AlignedFrames<'_>) {
        let LoopMode::Collect { writer, state } = &mut self.mode else {
            debug!("Save key ignored while streaming");
            return;
        };

        match writer.save(*state, aligned.color(), &aligned.depth) {
            Ok((saved, next)) => {
                *state = next;
                self.message = Some(saved.to_string());
                self.saved.push(saved);
            }
            Err(e) => {
                error!(index = state.next_index, error = %e, "Failed to save frame pair");
                self.message = Some(format!("Save failed: {}", e));
                self.failed_saves += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::StreamConfig;
    use crate::backends::camera::synthetic::SyntheticBackend;
    use crate::config::ColorizerSettings;
    use crate::input::ScriptedInput;

    #[derive(Default)]
    struct CountingSurface {
        titles: Vec<String>,
        widths: Vec<u32>,
    }

    impl PreviewSurface for CountingSurface {
        fn present(&mut self, title: &str, canvas: &RgbImage, _status: &str) -> AppResult<()> {
            self.titles.push(title.to_string());
            self.widths.push(canvas.width());
            Ok(())
        }
    }

    fn small_session() -> DeviceSession<SyntheticBackend> {
        let config = StreamConfig {
            width: 32,
            height: 24,
            fps: 30,
        };
        DeviceSession::open(SyntheticBackend::unpaced(), config).unwrap()
    }

    #[test]
    fn test_stream_mode_shows_two_panels() {
        let mut surface = CountingSurface::default();
        let input = ScriptedInput::new([None, Some(InputEvent::Save), Some(InputEvent::Quit)]);
        let colorizer = Colorizer::new(ColorizerSettings::default(), 0.001);
        let report = CaptureLoop::stream(input, &mut surface, colorizer)
            .run(small_session())
            .unwrap();

        assert_eq!(report.exit, ExitReason::Quit);
        assert_eq!(report.frames_presented, 3);
        assert!(report.saved.is_empty());
        assert_eq!(report.final_state, None);
        assert!(surface.widths.iter().all(|&w| w == 64));
        assert!(surface.titles.iter().all(|t| t == preview::STREAM_TITLE));
    }

    #[test]
    fn test_interrupt_terminates() {
        let mut surface = CountingSurface::default();
        let input = ScriptedInput::new([Some(InputEvent::Other), Some(InputEvent::Interrupt)]);
        let colorizer = Colorizer::new(ColorizerSettings::default(), 0.001);
        let report = CaptureLoop::stream(input, &mut surface, colorizer)
            .run(small_session())
            .unwrap();
        assert_eq!(report.exit, ExitReason::Interrupted);
        assert_eq!(report.frames_presented, 2);
    }
}
