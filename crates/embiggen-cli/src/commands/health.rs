use anyhow::{bail, Context, Result};
use embiggen_core::backend::HttpBackend;
use embiggen_core::settings::EmbiggenConfig;

pub fn run(config: &EmbiggenConfig) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let status = backend
        .health()
        .with_context(|| format!("Backend unreachable at {}", backend.base_url()))?;

    if !status.ok {
        bail!("Backend at {} reports unhealthy", backend.base_url());
    }
    println!("Backend at {} is healthy", backend.base_url());
    Ok(())
}
