use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use embiggen_core::backend::{DetectionBackend, HttpBackend};
use embiggen_core::settings::EmbiggenConfig;

#[derive(Args)]
pub struct DetectArgs {
    /// Backend-side image path (as returned by upload)
    #[arg(long)]
    pub path: String,

    /// Pyramid level to run detection at
    #[arg(short, long, default_value = "0")]
    pub level: u32,

    /// Treat --path as a sample image id and use the sample endpoint
    #[arg(long)]
    pub sample: bool,

    /// Output file path
    #[arg(short, long, default_value = "heatmap.png")]
    pub output: PathBuf,
}

pub fn run(args: &DetectArgs, config: &EmbiggenConfig) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;

    let bytes = if args.sample {
        backend.detect(&args.path, args.level)
    } else {
        backend.detect_on_path(&args.path, args.level)
    }
    .with_context(|| format!("Detection failed for {} at level {}", args.path, args.level))?;

    let heatmap =
        image::load_from_memory(&bytes).context("Backend returned an undecodable heatmap")?;
    heatmap
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Heatmap {}x{} (level {}) saved to {}",
        heatmap.width(),
        heatmap.height(),
        args.level,
        args.output.display()
    );
    Ok(())
}
