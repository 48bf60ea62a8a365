pub mod annotations;
pub mod config;
pub mod detect;
pub mod health;
pub mod level;
pub mod simulate;
pub mod upload;

use std::path::Path;

use anyhow::{Context, Result};
use embiggen_core::settings::EmbiggenConfig;

/// Configuration from `path` (or defaults), with the environment override
/// for the backend URL applied.
pub fn load_config(path: Option<&Path>) -> Result<EmbiggenConfig> {
    let mut config = match path {
        Some(path) => EmbiggenConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EmbiggenConfig::default(),
    };
    config.backend = config.backend.with_env_override();
    Ok(config)
}
