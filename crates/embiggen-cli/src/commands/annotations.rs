use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use embiggen_core::backend::{AnnotationShape, HttpBackend};
use embiggen_core::settings::EmbiggenConfig;

#[derive(Args)]
pub struct AnnotationsArgs {
    #[command(subcommand)]
    pub action: AnnotationAction,
}

#[derive(Subcommand)]
pub enum AnnotationAction {
    /// List stored annotations
    List,
    /// Add a point annotation (normalized coordinates)
    AddPoint { x: f64, y: f64 },
    /// Add a rectangle annotation (normalized coordinates)
    AddRect { x: f64, y: f64, w: f64, h: f64 },
    /// Delete all annotations
    Clear,
}

pub fn run(args: &AnnotationsArgs, config: &EmbiggenConfig) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;

    match args.action {
        AnnotationAction::List => {
            let annotations = backend.annotations().context("Failed to list annotations")?;
            if annotations.is_empty() {
                println!("No annotations");
            }
            for annotation in &annotations {
                println!("{annotation}");
            }
        }
        AnnotationAction::AddPoint { x, y } => {
            let stored = backend
                .add_annotation(AnnotationShape::Point { x, y })
                .context("Failed to add annotation")?;
            println!("Added {stored}");
        }
        AnnotationAction::AddRect { x, y, w, h } => {
            let stored = backend
                .add_annotation(AnnotationShape::Rect { x, y, w, h })
                .context("Failed to add annotation")?;
            println!("Added {stored}");
        }
        AnnotationAction::Clear => {
            let deleted = backend
                .clear_annotations()
                .context("Failed to clear annotations")?;
            println!("{}", if deleted { "Annotations cleared" } else { "Nothing deleted" });
        }
    }
    Ok(())
}
