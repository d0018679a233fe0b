use anyhow::{bail, Context};
use clap::Parser;
use opencv::{imgcodecs, prelude::*};
use smartzoom::{Config, ZoomPipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Zoom a single still image onto its largest face.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Input image path
    #[arg(long)]
    input: PathBuf,
    /// Output image path
    #[arg(long, default_value = "zoomed.jpg")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smartzoom=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::default(),
    };
    let mut pipeline = ZoomPipeline::from_config(&config)?;

    let img = imgcodecs::imread(&args.input.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
    if img.empty() {
        bail!("Failed to load image: {:?}", args.input);
    }

    let out = pipeline.process(&img)?;
    match out.subject {
        Some(face) => info!("Face at {:?}, crop {:?}", face, out.crop),
        None => info!("No face found, writing the image unchanged"),
    }

    imgcodecs::imwrite(&args.output.to_string_lossy(), &out.frame, &opencv::core::Vector::new())?;
    info!("Wrote {:?}", args.output);
    Ok(())
}
