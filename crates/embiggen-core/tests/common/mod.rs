#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embiggen_core::error::{EmbiggenError, Result};
use embiggen_core::fetch::{FetchCompletion, HeatmapFetcher};
use embiggen_core::geometry::ContentSize;
use embiggen_core::refresh::{FetchOutcome, RefreshRequest};
use embiggen_core::session::LevelCallback;
use embiggen_core::source::{DisplayRequest, ImageSource};

pub const IMAGE_SIZE: ContentSize = ContentSize {
    width: 2000,
    height: 1000,
};

/// Fetcher that records requests and completes them only when told to.
#[derive(Default)]
pub struct ManualFetcher {
    pub submitted: Vec<RefreshRequest>,
    ready: Vec<FetchCompletion>,
    pub fail_submit: bool,
}

impl ManualFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a completion for `request`, delivered on the next drain.
    pub fn resolve(&mut self, request: &RefreshRequest, outcome: FetchOutcome) {
        self.ready.push(FetchCompletion {
            ticket: request.ticket.clone(),
            level: request.level,
            outcome,
            elapsed: Duration::from_millis(5),
        });
    }

    pub fn last(&self) -> RefreshRequest {
        self.submitted.last().cloned().expect("no request submitted")
    }
}

impl HeatmapFetcher for ManualFetcher {
    fn submit(&mut self, request: RefreshRequest) -> Result<()> {
        if self.fail_submit {
            return Err(EmbiggenError::WorkerDisconnected);
        }
        self.submitted.push(request);
        Ok(())
    }

    fn drain(&mut self) -> Vec<FetchCompletion> {
        std::mem::take(&mut self.ready)
    }
}

/// Shared handle to a [`ManualFetcher`] so tests can keep inspecting it
/// after handing it to a host.
#[derive(Clone, Default)]
pub struct SharedFetcher(pub Arc<Mutex<ManualFetcher>>);

impl SharedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<RefreshRequest> {
        self.0.lock().unwrap().submitted.clone()
    }

    pub fn resolve(&self, request: &RefreshRequest, outcome: FetchOutcome) {
        self.0.lock().unwrap().resolve(request, outcome);
    }
}

impl HeatmapFetcher for SharedFetcher {
    fn submit(&mut self, request: RefreshRequest) -> Result<()> {
        self.0.lock().unwrap().submit(request)
    }

    fn drain(&mut self) -> Vec<FetchCompletion> {
        self.0.lock().unwrap().drain()
    }
}

pub fn manifest_request(name: &str) -> DisplayRequest {
    DisplayRequest::new(ImageSource::from_url(format!(
        "http://localhost:8000/tiles/{name}.dzi"
    )))
    .with_detection_path(format!("uploads/{name}.png"))
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Level callback that records every committed level.
pub fn recording_callback() -> (LevelCallback, Arc<Mutex<Vec<u32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: LevelCallback = Arc::new(move |level: u32| sink.lock().unwrap().push(level));
    (callback, seen)
}

/// A tiny PNG the registry can wrap as a heatmap resource.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 128]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn start() -> Instant {
    Instant::now()
}
