use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use embiggen_core::settings::EmbiggenConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the effective config (file + environment) instead of defaults
    #[arg(long)]
    pub effective: bool,
}

/// Print or save the default (or effective) configuration as TOML.
pub fn run(args: &ConfigArgs, effective: &EmbiggenConfig) -> Result<()> {
    let config = if args.effective {
        effective.clone()
    } else {
        EmbiggenConfig::default()
    };

    if let Some(ref path) = args.output {
        config
            .save(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    } else {
        print!("{}", config.to_toml()?);
    }

    Ok(())
}
