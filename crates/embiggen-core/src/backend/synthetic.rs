use std::io::Cursor;
use std::thread;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::Result;
use crate::geometry::ContentSize;

use super::DetectionBackend;

/// Smallest heatmap edge the synthetic backend produces.
const MIN_HEATMAP_EDGE: u32 = 32;

/// Offline stand-in for the detection service. Produces a translucent
/// red/blue PNG whose resolution shrinks with the level, like the service's
/// fallback path when no precomputed heatmap exists.
#[derive(Clone, Debug)]
pub struct SyntheticBackend {
    size: ContentSize,
    latency: Duration,
}

impl SyntheticBackend {
    pub fn new(size: ContentSize) -> Self {
        Self {
            size,
            latency: Duration::ZERO,
        }
    }

    /// Sleep this long before answering, to mimic network time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn render(&self, level: u32) -> RgbaImage {
        let scale = level.clamp(1, 8);
        let width = (self.size.width / scale).max(MIN_HEATMAP_EDGE);
        let height = (self.size.height / scale).max(MIN_HEATMAP_EDGE);
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13 + level * 31) % 256) as u8;
            Rgba([v, 0, 255 - v, 128])
        })
    }
}

impl DetectionBackend for SyntheticBackend {
    fn detect_on_path(&self, _image_path: &str, level: u32) -> Result<Vec<u8>> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let mut png = Cursor::new(Vec::new());
        self.render(level).write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}
