// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use depth_capture::backends::camera::CameraBackendType;
use depth_capture::config::{CaptureConfig, CaptureMode, ColorScheme, OverwritePolicy};
use depth_capture::constants::{dataset, depth, stream};

mod cli;

#[derive(Parser)]
#[command(name = "depth-capture")]
#[command(about = "Stream, align and collect RGB-D frame pairs in the terminal")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show color next to the aligned, colorized depth
    Stream {
        #[command(flatten)]
        camera: CameraArgs,
        #[command(flatten)]
        view: ViewArgs,
        #[command(flatten)]
        scene: SceneArgs,
    },

    /// Preview with labels and save a frame pair on Space
    Collect {
        #[command(flatten)]
        camera: CameraArgs,
        #[command(flatten)]
        view: ViewArgs,
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the devices each backend can open
    List {
        /// Only query this backend
        #[arg(short, long, value_enum)]
        backend: Option<CameraBackendType>,
    },
}

#[derive(Args)]
struct CameraArgs {
    /// Camera backend
    #[arg(short, long, value_enum, default_value_t = CameraBackendType::default())]
    backend: CameraBackendType,

    /// RealSense serial number (default: first device found)
    #[arg(long)]
    serial: Option<String>,

    /// Stream width in pixels
    #[arg(long, default_value_t = stream::WIDTH)]
    width: u32,

    /// Stream height in pixels
    #[arg(long, default_value_t = stream::HEIGHT)]
    height: u32,

    /// Stream frame rate
    #[arg(long, default_value_t = stream::FPS)]
    fps: u32,

    /// Dataset root the replay backend reads (default: --dataset-root)
    #[arg(long)]
    replay_root: Option<PathBuf>,
}

#[derive(Args)]
struct ViewArgs {
    /// Depth colormap
    #[arg(long, value_enum, default_value_t = ColorScheme::default())]
    color_scheme: ColorScheme,

    /// Map depth linearly over --min-depth..--max-depth instead of equalizing
    #[arg(long)]
    no_equalize: bool,

    /// Nearest depth in meters for linear mapping
    #[arg(long, default_value_t = depth::MIN_METERS)]
    min_depth: f32,

    /// Farthest depth in meters for linear mapping
    #[arg(long, default_value_t = depth::MAX_METERS)]
    max_depth: f32,
}

#[derive(Args)]
struct SceneArgs {
    /// Scene label, used as the directory name in both trees
    #[arg(short, long, default_value = dataset::DEFAULT_SCENE)]
    scene: String,

    /// Dataset root holding the rgb/ and depth/ trees
    #[arg(long, default_value = dataset::DEFAULT_ROOT)]
    dataset_root: PathBuf,
}

#[derive(Args)]
struct OutputArgs {
    /// Color tree (default: <dataset-root>/rgb)
    #[arg(long)]
    rgb_root: Option<PathBuf>,

    /// Depth tree (default: <dataset-root>/depth)
    #[arg(long)]
    depth_root: Option<PathBuf>,

    /// What to do when the scene already holds captures
    #[arg(long, value_enum, default_value_t = OverwritePolicy::default())]
    on_existing: OverwritePolicy,
}

impl CameraArgs {
    fn apply(self, config: &mut CaptureConfig) {
        config.backend = self.backend;
        config.device_serial = self.serial;
        config.stream.width = self.width;
        config.stream.height = self.height;
        config.stream.fps = self.fps;
        config.replay_root = self.replay_root;
    }
}

impl ViewArgs {
    fn apply(self, config: &mut CaptureConfig) {
        config.colorizer.scheme = self.color_scheme;
        config.colorizer.equalize = !self.no_equalize;
        config.colorizer.min_meters = self.min_depth;
        config.colorizer.max_meters = self.max_depth;
    }
}

impl SceneArgs {
    fn apply(self, config: &mut CaptureConfig) {
        config.scene = self.scene;
        config.dataset_root = self.dataset_root;
    }
}

impl OutputArgs {
    fn apply(self, config: &mut CaptureConfig) {
        config.rgb_root = self.rgb_root;
        config.depth_root = self.depth_root;
        config.overwrite = self.on_existing;
    }
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depth_capture=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { backend } => cli::list_devices(backend),
        Commands::Stream {
            camera,
            view,
            scene,
        } => {
            let mut config = CaptureConfig {
                mode: CaptureMode::Stream,
                ..CaptureConfig::default()
            };
            camera.apply(&mut config);
            view.apply(&mut config);
            scene.apply(&mut config);
            cli::run(config)
        }
        Commands::Collect {
            camera,
            view,
            scene,
            output,
        } => {
            let mut config = CaptureConfig {
                mode: CaptureMode::Collect,
                ..CaptureConfig::default()
            };
            camera.apply(&mut config);
            view.apply(&mut config);
            scene.apply(&mut config);
            output.apply(&mut config);
            cli::run(config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
