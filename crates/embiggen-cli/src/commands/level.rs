use anyhow::Result;
use clap::Args;
use embiggen_core::level::{estimate_level_clamped, level_scale};
use embiggen_core::settings::EmbiggenConfig;

#[derive(Args)]
pub struct LevelArgs {
    /// Viewport zoom factors
    #[arg(required = true, allow_negative_numbers = true)]
    pub zooms: Vec<f64>,

    /// Highest level to report (defaults to the configured maximum)
    #[arg(long)]
    pub max_level: Option<u32>,
}

pub fn run(args: &LevelArgs, config: &EmbiggenConfig) -> Result<()> {
    let max_level = args.max_level.unwrap_or(config.viewer.max_level);
    println!("{:>12}  {:>5}  {:>8}", "zoom", "level", "scale");
    for &zoom in &args.zooms {
        let level = estimate_level_clamped(zoom, max_level);
        println!("{:>12.4}  {:>5}  {:>7}x", zoom, level, level_scale(level));
    }
    Ok(())
}
