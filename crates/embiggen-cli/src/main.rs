mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embiggen", about = "Deep-zoom heatmap viewer tooling")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,
    /// Upload an image, tile it and resolve its manifest URL
    Upload(commands::upload::UploadArgs),
    /// Fetch a detection heatmap and save it
    Detect(commands::detect::DetectArgs),
    /// Print the pyramid level for zoom factors
    Level(commands::level::LevelArgs),
    /// List, add or clear annotations
    Annotations(commands::annotations::AnnotationsArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
    /// Replay zoom steps through a viewer session
    Simulate(commands::simulate::SimulateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Health => commands::health::run(&config),
        Commands::Upload(args) => commands::upload::run(args, &config),
        Commands::Detect(args) => commands::detect::run(args, &config),
        Commands::Level(args) => commands::level::run(args, &config),
        Commands::Annotations(args) => commands::annotations::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Simulate(args) => commands::simulate::run(args, &config),
    }
}
