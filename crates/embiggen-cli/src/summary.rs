use std::path::PathBuf;

use console::Style;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub struct UploadSummary {
    pub file: PathBuf,
    pub image_path: String,
    pub dzi_path: Option<String>,
    pub manifest_url: Option<String>,
}

pub fn print_upload_summary(summary: &UploadSummary) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Upload"));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("File"),
        s.path.apply_to(summary.file.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Image path"),
        s.value.apply_to(&summary.image_path)
    );
    match (&summary.dzi_path, &summary.manifest_url) {
        (Some(dzi), Some(url)) => {
            println!("  {:<14}{}", s.label.apply_to("Manifest"), s.value.apply_to(dzi));
            println!("  {:<14}{}", s.label.apply_to("URL"), s.path.apply_to(url));
        }
        _ => println!(
            "  {:<14}{}",
            s.label.apply_to("Tiles"),
            s.disabled.apply_to("skipped")
        ),
    }
    println!();
}

pub struct SimulationSummary {
    pub source: String,
    pub committed_levels: Vec<u32>,
    pub final_zoom: Option<f64>,
    pub final_level: Option<u32>,
    pub overlay_count: usize,
    pub overlay_opacity: Option<f32>,
    pub overlay_resource: Option<String>,
    pub live_resources: usize,
    pub live_renderers: usize,
}

pub fn print_simulation_summary(summary: &SimulationSummary) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Viewer Simulation"));
    println!();
    println!(
        "  {:<18}{}",
        s.label.apply_to("Source"),
        s.path.apply_to(&summary.source)
    );

    let levels: Vec<String> = summary
        .committed_levels
        .iter()
        .map(|l| l.to_string())
        .collect();
    println!(
        "  {:<18}{}",
        s.label.apply_to("Level changes"),
        s.value.apply_to(levels.join(" -> "))
    );
    if let Some(zoom) = summary.final_zoom {
        println!(
            "  {:<18}{}",
            s.label.apply_to("Final zoom"),
            s.value.apply_to(format!("{zoom:.3}x"))
        );
    }
    match summary.final_level {
        Some(level) => println!(
            "  {:<18}{}",
            s.label.apply_to("Final level"),
            s.value.apply_to(level)
        ),
        None => println!(
            "  {:<18}{}",
            s.label.apply_to("Final level"),
            s.disabled.apply_to("none")
        ),
    }

    match (&summary.overlay_resource, summary.overlay_opacity) {
        (Some(resource), Some(opacity)) => println!(
            "  {:<18}{} at {:.0}% ({} element)",
            s.label.apply_to("Overlay"),
            s.value.apply_to(resource),
            opacity * 100.0,
            summary.overlay_count
        ),
        _ => println!(
            "  {:<18}{}",
            s.label.apply_to("Overlay"),
            s.disabled.apply_to("none")
        ),
    }
    println!(
        "  {:<18}{}",
        s.label.apply_to("Live renderers"),
        s.value.apply_to(summary.live_renderers)
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Live resources"),
        s.value.apply_to(summary.live_resources)
    );
    println!();
}
