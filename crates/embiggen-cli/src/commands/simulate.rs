use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use embiggen_core::backend::{HttpBackend, SyntheticBackend};
use embiggen_core::fetch::{HeatmapFetcher, ThreadedFetcher};
use embiggen_core::geometry::ContentSize;
use embiggen_core::refresh::RefreshPhase;
use embiggen_core::renderer::{HeadlessFactory, RendererFactory};
use embiggen_core::session::ViewerHost;
use embiggen_core::settings::{EmbiggenConfig, Settings};
use embiggen_core::source::{DisplayRequest, ImageSource};
use tracing::info;

use crate::summary::{print_simulation_summary, SimulationSummary};

/// Interval at which the simulated event loop is pumped.
const TICK: Duration = Duration::from_millis(10);

#[derive(Args)]
pub struct SimulateArgs {
    /// Zoom factors to step through, in order
    #[arg(required = true)]
    pub zooms: Vec<f64>,

    /// Image or manifest URL to display
    #[arg(long, default_value = "http://localhost:8000/tiles/image.dzi")]
    pub source: String,

    /// Backend-side image path used for detection requests
    #[arg(long, default_value = "uploads/image.png")]
    pub image_path: String,

    /// Delay between zoom steps in milliseconds
    #[arg(long, default_value = "50")]
    pub step_ms: u64,

    /// Base image width in pixels
    #[arg(long, default_value = "2048")]
    pub width: u32,

    /// Base image height in pixels
    #[arg(long, default_value = "1536")]
    pub height: u32,

    /// Heatmap overlay opacity (0-1)
    #[arg(long)]
    pub opacity: Option<f32>,

    /// Do not fetch heatmaps on level changes
    #[arg(long)]
    pub no_auto_refresh: bool,

    /// Generate heatmaps locally instead of calling the backend
    #[arg(long)]
    pub offline: bool,
}

pub fn run(args: &SimulateArgs, config: &EmbiggenConfig) -> Result<()> {
    let size = ContentSize::new(args.width, args.height);
    let factory = HeadlessFactory::new(size);

    let fetcher = if args.offline {
        let backend = SyntheticBackend::new(size).with_latency(Duration::from_millis(150));
        ThreadedFetcher::spawn(backend)?
    } else {
        ThreadedFetcher::spawn(HttpBackend::new(&config.backend)?)?
    };

    let mut settings = Settings::new(config.viewer.clone());
    settings.update(|s| {
        if let Some(opacity) = args.opacity {
            s.overlay_opacity = opacity;
        }
        if args.no_auto_refresh {
            s.auto_refresh = false;
        }
    });
    let debounce = settings.get().debounce();

    let mut host = ViewerHost::new(factory.clone(), fetcher, settings);
    let committed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&committed);
    host.set_level_callback(Some(Arc::new(move |level: u32| {
        if let Ok(mut levels) = sink.lock() {
            levels.push(level);
        }
    })));

    let request = DisplayRequest::new(ImageSource::from_url(&args.source))
        .with_detection_path(&args.image_path);
    host.display(request)?;
    let renderer = factory.latest().context("Renderer was not created")?;

    renderer.open();
    host.pump(Instant::now())?;

    let step = Duration::from_millis(args.step_ms);
    for &zoom in &args.zooms {
        info!(zoom, "zoom step");
        renderer.zoom_to(zoom);
        host.pump(Instant::now())?;
        sleep_pumping(&mut host, step)?;
    }
    renderer.finish_animation();

    // Let the debounce window elapse and any fetch settle.
    let give_up = Instant::now() + debounce + Duration::from_secs(config.backend.timeout_secs);
    loop {
        let now = Instant::now();
        host.pump(now)?;
        let idle = host
            .session()
            .map_or(true, |s| s.phase() == RefreshPhase::Idle);
        if idle {
            break;
        }
        if now >= give_up {
            bail!("Heatmap refresh did not settle in time");
        }
        thread::sleep(TICK);
    }

    let overlays = renderer.overlays();
    let summary = SimulationSummary {
        source: args.source.clone(),
        committed_levels: committed.lock().map(|l| l.clone()).unwrap_or_default(),
        final_zoom: host.session().and_then(|s| s.zoom()),
        final_level: host.level(),
        overlay_count: overlays.len(),
        overlay_opacity: overlays.first().map(|o| o.opacity),
        overlay_resource: overlays.first().map(|o| o.resource.to_string()),
        live_resources: host.registry().live_count(),
        live_renderers: factory.live_instances(),
    };

    host.close();
    print_simulation_summary(&summary);

    if factory.live_instances() != 0 || host.registry().live_count() != 0 {
        bail!("Session teardown leaked renderer or heatmap resources");
    }
    Ok(())
}

fn sleep_pumping<F, H>(host: &mut ViewerHost<F, H>, duration: Duration) -> Result<()>
where
    F: RendererFactory,
    H: HeatmapFetcher,
{
    let until = Instant::now() + duration;
    while Instant::now() < until {
        thread::sleep(TICK.min(until.saturating_duration_since(Instant::now())));
        host.pump(Instant::now())?;
    }
    Ok(())
}
