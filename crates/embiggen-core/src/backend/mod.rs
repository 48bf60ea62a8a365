//! Client side of the image-processing backend.

mod http;
mod synthetic;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use http::{manifest_candidates, HttpBackend};
pub use synthetic::SyntheticBackend;

/// Anything that can produce a heatmap for an uploaded image at a level.
pub trait DetectionBackend {
    /// Encoded heatmap image (PNG) for `image_path` at `level`.
    fn detect_on_path(&self, image_path: &str, level: u32) -> Result<Vec<u8>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Backend-side path of the stored image.
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesResponse {
    /// Manifest path relative to the static file root.
    pub dzi_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Geometry of a user annotation, in normalized image coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationShape {
    Point { x: f64, y: f64 },
    Rect { x: f64, y: f64, w: f64, h: f64 },
}

/// A stored annotation. `id` is assigned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub shape: AnnotationShape,
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = self.id {
            write!(f, "#{id} ")?;
        }
        match self.shape {
            AnnotationShape::Point { x, y } => write!(f, "point ({x:.3}, {y:.3})"),
            AnnotationShape::Rect { x, y, w, h } => {
                write!(f, "rect ({x:.3}, {y:.3}) {w:.3}x{h:.3}")
            }
        }
    }
}
