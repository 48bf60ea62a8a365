use serde::{Deserialize, Serialize};

/// Pixel dimensions of the full-resolution base image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSize {
    pub width: u32,
    pub height: u32,
}

impl ContentSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rectangle covering the whole image in image coordinates.
    pub fn full_rect(&self) -> ImageRect {
        ImageRect {
            x: 0.0,
            y: 0.0,
            width: self.width as f64,
            height: self.height as f64,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f64 / self.width as f64
    }
}

/// Rectangle in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in the renderer's viewport coordinates, where the image width
/// spans `[0, 1]` and the height spans `[0, aspect_ratio]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    /// Map an image-space rectangle into viewport space for an image of
    /// `size`. This is the transform deep-zoom viewers use when rotation is
    /// applied to the viewport rather than to overlay coordinates.
    pub fn from_image_rect(rect: ImageRect, size: ContentSize) -> Self {
        let scale = if size.width == 0 {
            0.0
        } else {
            1.0 / size.width as f64
        };
        Self {
            x: rect.x * scale,
            y: rect.y * scale,
            width: rect.width * scale,
            height: rect.height * scale,
        }
    }
}
