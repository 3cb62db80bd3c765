// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Listing the devices each backend can open
//! - Running the stream / collect loop against a configured backend

use depth_capture::backends::camera::{
    CameraBackendType, DeviceSession, create_backend, enumerate_devices,
};
use depth_capture::capture_loop::{CaptureLoop, LoopFailure, LoopReport};
use depth_capture::config::{CaptureConfig, CaptureMode};
use depth_capture::errors::AppResult;
use depth_capture::input::TerminalInput;
use depth_capture::pipelines::preview::Colorizer;
use depth_capture::storage::DatasetWriter;
use depth_capture::terminal::TerminalPreview;
use tracing::{info, warn};

const ALL_BACKENDS: [CameraBackendType; 3] = [
    CameraBackendType::RealSense,
    CameraBackendType::Synthetic,
    CameraBackendType::Replay,
];

/// List devices for one backend, or for all of them
pub fn list_devices(backend: Option<CameraBackendType>) -> AppResult<()> {
    let backends = match backend {
        Some(backend) => vec![backend],
        None => ALL_BACKENDS.to_vec(),
    };

    for backend in backends {
        println!("{}:", backend);
        match enumerate_devices(backend) {
            Ok(devices) if devices.is_empty() => {
                if backend == CameraBackendType::Replay {
                    println!("  (reads a dataset scene, see --replay-root)");
                } else {
                    println!("  No devices found.");
                }
            }
            Ok(devices) => {
                for (index, device) in devices.iter().enumerate() {
                    match &device.serial {
                        Some(serial) => println!("  [{}] {} (serial {})", index, device.name, serial),
                        None => println!("  [{}] {}", index, device.name),
                    }
                }
            }
            Err(e) => println!("  Unavailable: {}", e),
        }
        println!();
    }
    Ok(())
}

/// Open the camera, run the loop in the terminal, then report what was saved
pub fn run(config: CaptureConfig) -> AppResult<()> {
    config.validate()?;
    info!(
        mode = ?config.mode,
        backend = %config.backend,
        stream = %config.stream,
        "Starting capture"
    );

    let backend = create_backend(&config)?;
    let session = DeviceSession::open(backend, config.stream)?;
    let colorizer = Colorizer::new(config.colorizer, session.calibration().depth_scale);
    let input = TerminalInput::new().with_signal_handler();

    let report = match config.mode {
        CaptureMode::Stream => {
            let mut preview = TerminalPreview::enter()?;
            let result = CaptureLoop::stream(input, &mut preview, colorizer).run(session);
            finish(preview, result)?
        }
        CaptureMode::Collect => {
            let writer = DatasetWriter::new(config.layout(), config.overwrite);
            writer.prepare()?;
            if let Err(e) = writer.write_calibration(session.calibration()) {
                warn!(error = %e, "Calibration sidecar not written");
            }
            let state = writer.initial_state()?;

            let mut preview = TerminalPreview::enter()?;
            let result =
                CaptureLoop::collect(input, &mut preview, colorizer, writer, state).run(session);
            finish(preview, result)?
        }
    };

    print_report(&report);
    Ok(())
}

/// Restore the terminal before anything is printed
///
/// Pairs saved before a fatal error are still listed.
fn finish(
    preview: TerminalPreview,
    result: Result<LoopReport, LoopFailure>,
) -> AppResult<LoopReport> {
    let restored = preview.leave();
    match result {
        Ok(report) => {
            restored?;
            Ok(report)
        }
        Err(failure) => {
            if let Err(e) = restored {
                warn!(error = %e, "Terminal not fully restored");
            }
            print_report(&failure.report);
            Err(failure.error)
        }
    }
}

fn print_report(report: &LoopReport) {
    for saved in &report.saved {
        println!("{}", saved);
    }
    if report.failed_saves > 0 {
        eprintln!("{} save(s) failed, see the log for details", report.failed_saves);
    }
}
