use anyhow::{bail, Context};
use clap::Parser;
use opencv::{
    core::{self, Size},
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use smartzoom::{
    tracker::TrackerKind,
    utils::FpsMeter,
    visualization, Config, ZoomPipeline,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const WINDOW_NAME: &str = "Smart Zoom";

#[derive(Parser)]
#[command(
    name = "smartzoom",
    about = "Keep a face centered and framed in a live video stream",
    version = "0.1.0"
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera index to capture from
    #[arg(long, default_value_t = 0)]
    camera: i32,

    /// Read frames from a video file instead of a camera
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the zoomed stream to this video file (.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not open a preview window
    #[arg(long)]
    headless: bool,

    /// Outline the located face (drawn before zooming)
    #[arg(long)]
    show_subject: bool,

    /// Override the smoothing factor (0, 1]
    #[arg(long)]
    smoothing: Option<f64>,

    /// Override the margin factor (>= 0)
    #[arg(long)]
    margin: Option<f64>,

    /// Override the width used for detection and tracking
    #[arg(long)]
    process_width: Option<i32>,

    /// Override the tracker algorithm
    #[arg(long, value_enum)]
    tracker: Option<TrackerKind>,
}

struct ProcessingState {
    pipeline: ZoomPipeline,
    writer: Option<VideoWriter>,
    fps_meter: FpsMeter,
    show_window: bool,
    show_subject: bool,
    show_fps: bool,
    mirror: bool,
}

impl ProcessingState {
    /// Process one captured frame. Returns `false` when the user asked to quit.
    fn process_frame(&mut self, captured: &Mat) -> anyhow::Result<bool> {
        let mut frame = if self.mirror {
            let mut flipped = Mat::default();
            core::flip(captured, &mut flipped, 1)?;
            flipped
        } else {
            captured.try_clone()?
        };

        let located = self.pipeline.process(&frame)?;
        let mut output = located.frame;

        if self.show_subject {
            if let Some(subject) = &located.subject {
                // Redo the zoom on an annotated copy so the box scales with it.
                visualization::draw_subject(&mut frame, subject)?;
                output = smartzoom::resample::resample(&frame, &located.crop)?;
            }
        }

        if let Some(fps) = self.fps_meter.tick() {
            if self.show_fps {
                visualization::draw_fps(&mut output, fps)?;
            }
        }

        if let Some(writer) = &mut self.writer {
            writer.write(&output)?;
        }

        if self.show_window {
            highgui::imshow(WINDOW_NAME, &output)?;
            let key = highgui::wait_key(1)?;
            if key == 'q' as i32 || key == 27 {
                info!("Stopped by user");
                return Ok(false);
            }
            if key == 'r' as i32 {
                match self.pipeline.viewport().smoothed() {
                    Some(s) => info!(
                        "Viewport reset (was following x={:.0} y={:.0} w={:.0} h={:.0})",
                        s[0], s[1], s[2], s[3]
                    ),
                    None => info!("Viewport reset"),
                }
                self.pipeline.reset();
            }
        }

        Ok(true)
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("smartzoom=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::default(),
    };

    // Override config with command line arguments if provided
    if let Some(smoothing) = args.smoothing {
        config.smoothing_factor = smoothing;
    }
    if let Some(margin) = args.margin {
        config.margin_factor = margin;
    }
    if let Some(width) = args.process_width {
        config.process_width = width;
    }
    if let Some(kind) = args.tracker {
        config.tracker = kind;
    }
    config.validate()?;
    Ok(config)
}

fn open_capture(args: &Args) -> anyhow::Result<VideoCapture> {
    let cap = match &args.input {
        Some(path) => VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?,
        None => VideoCapture::new(args.camera, videoio::CAP_ANY)?,
    };
    if !cap.is_opened()? {
        match &args.input {
            Some(path) => bail!("Could not open video file {:?}", path),
            None => bail!(
                "Could not open camera {}. Make sure it is connected and not used by another application.",
                args.camera
            ),
        }
    }
    Ok(cap)
}

fn open_writer(path: &Path, fps: f64, size: Size) -> anyhow::Result<VideoWriter> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let writer = VideoWriter::new(&path.to_string_lossy(), fourcc, fps, size, true)?;
    if !writer.is_opened()? {
        bail!("Failed to open video writer at {:?}", path);
    }
    Ok(writer)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(&args)?;
    info!("Configuration: {:?}", config);

    let pipeline = ZoomPipeline::from_config(&config).context("Failed to build zoom pipeline")?;
    let mut cap = open_capture(&args)?;

    let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
    let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
    let source_fps = cap.get(videoio::CAP_PROP_FPS)?;
    info!("Capture opened: {}x{} @ {:.1} fps", width, height, source_fps);

    let writer = match &args.output {
        Some(path) => {
            let fps = if source_fps > 0.0 { source_fps } else { 30.0 };
            Some(open_writer(path, fps, Size::new(width, height))?)
        }
        None => None,
    };

    if !args.headless {
        highgui::named_window(WINDOW_NAME, highgui::WINDOW_NORMAL)?;
    }

    let mut state = ProcessingState {
        pipeline,
        writer,
        fps_meter: FpsMeter::new(),
        show_window: !args.headless,
        show_subject: args.show_subject,
        show_fps: config.show_fps,
        mirror: config.mirror && args.input.is_none(),
    };

    info!("Starting smart zoom. Press 'q' to quit, 'r' to reset the viewport.");

    let mut frame = Mat::default();
    let mut frame_count: u64 = 0;
    loop {
        if !cap.read(&mut frame)? || frame.empty() {
            if args.input.is_some() {
                info!("End of video after {} frames", frame_count);
            } else {
                error!("Failed to capture frame");
            }
            break;
        }

        let keep_going = state
            .process_frame(&frame)
            .with_context(|| format!("Frame {} failed", frame_count))?;
        if !keep_going {
            break;
        }
        frame_count += 1;
    }

    if let Some(writer) = &mut state.writer {
        writer.release()?;
    }
    if !args.headless {
        highgui::destroy_all_windows()?;
    }
    info!("Processed {} frames", frame_count);
    Ok(())
}
