use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use embiggen_core::backend::HttpBackend;
use embiggen_core::settings::EmbiggenConfig;
use indicatif::{ProgressBar, ProgressStyle};

use crate::summary::{print_upload_summary, UploadSummary};

#[derive(Args)]
pub struct UploadArgs {
    /// Image file to upload
    pub file: PathBuf,

    /// Only upload; skip tile generation and manifest lookup
    #[arg(long)]
    pub no_tiles: bool,
}

pub fn run(args: &UploadArgs, config: &EmbiggenConfig) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Uploading");
    let uploaded = backend
        .upload(&args.file)
        .with_context(|| format!("Failed to upload {}", args.file.display()))?;

    let mut summary = UploadSummary {
        file: args.file.clone(),
        image_path: uploaded.path,
        dzi_path: None,
        manifest_url: None,
    };

    if !args.no_tiles {
        spinner.set_message("Generating tiles");
        let tiles = backend
            .generate_tiles(&summary.image_path)
            .context("Tile generation failed")?;

        spinner.set_message("Resolving manifest");
        let url = backend
            .resolve_manifest_url(&tiles.dzi_path)
            .context("Generated manifest is not being served")?;

        summary.dzi_path = Some(tiles.dzi_path);
        summary.manifest_url = Some(url);
    }

    spinner.finish_and_clear();
    print_upload_summary(&summary);
    Ok(())
}
