use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{EmbiggenError, Result};
use crate::geometry::ContentSize;

/// How the renderer should open an [`ImageSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// A single flat image, no tiling.
    FlatImage,
    /// A multi-resolution tile manifest.
    Pyramid,
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FlatImage => write!(f, "Flat image"),
            Self::Pyramid => write!(f, "Pyramid"),
        }
    }
}

/// What a viewer session displays. Immutable for the session's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    Flat { url: String },
    Manifest { url: String },
    /// Inline Deep Zoom descriptor (JSON form).
    Descriptor(PyramidDescriptor),
}

const MANIFEST_EXTENSIONS: [&str; 3] = ["dzi", "xml", "json"];

impl ImageSource {
    /// Classify a URL by its path extension. Query strings and fragments are
    /// ignored.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        if is_manifest_url(&url) {
            Self::Manifest { url }
        } else {
            Self::Flat { url }
        }
    }

    pub fn open_mode(&self) -> OpenMode {
        match self {
            Self::Flat { .. } => OpenMode::FlatImage,
            Self::Manifest { .. } | Self::Descriptor(_) => OpenMode::Pyramid,
        }
    }

    /// URL the renderer loads. `None` for a descriptor without a tile URL.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Flat { url } | Self::Manifest { url } => Some(url),
            Self::Descriptor(d) => Some(d.image.url.as_str()).filter(|u| !u.is_empty()),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat { url } => write!(f, "image {url}"),
            Self::Manifest { url } => write!(f, "manifest {url}"),
            Self::Descriptor(d) => write!(
                f,
                "descriptor {} ({}x{})",
                d.image.url, d.image.size.width, d.image.size.height
            ),
        }
    }
}

fn is_manifest_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((_, ext)) => MANIFEST_EXTENSIONS
            .iter()
            .any(|m| ext.eq_ignore_ascii_case(m)),
        None => false,
    }
}

/// JSON form of a Deep Zoom (DZI) descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PyramidDescriptor {
    #[serde(rename = "Image")]
    pub image: DescriptorImage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DescriptorImage {
    /// Base URL of the tile directory.
    #[serde(rename = "Url", default)]
    pub url: String,
    #[serde(rename = "Format")]
    pub format: String,
    #[serde(rename = "Overlap", deserialize_with = "number_or_string")]
    pub overlap: u32,
    #[serde(rename = "TileSize", deserialize_with = "number_or_string")]
    pub tile_size: u32,
    #[serde(rename = "Size")]
    pub size: DescriptorSize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSize {
    #[serde(rename = "Width", deserialize_with = "number_or_string")]
    pub width: u32,
    #[serde(rename = "Height", deserialize_with = "number_or_string")]
    pub height: u32,
}

impl PyramidDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        if descriptor.image.size.width == 0 || descriptor.image.size.height == 0 {
            return Err(EmbiggenError::InvalidDescriptor(format!(
                "zero-sized image {}x{}",
                descriptor.image.size.width, descriptor.image.size.height
            )));
        }
        if descriptor.image.tile_size == 0 {
            return Err(EmbiggenError::InvalidDescriptor("tile size is 0".into()));
        }
        Ok(descriptor)
    }

    pub fn content_size(&self) -> ContentSize {
        ContentSize::new(self.image.size.width, self.image.size.height)
    }

    /// Number of resolution levels in the pyramid, from a 1x1 top level down
    /// to full resolution.
    pub fn level_count(&self) -> u32 {
        let longest = self.image.size.width.max(self.image.size.height).max(1);
        // ceil(log2(n)) for n >= 1
        let max_level = u32::BITS - (longest - 1).leading_zeros();
        max_level + 1
    }

    /// Tile columns and rows at the full-resolution level.
    pub fn tile_grid(&self) -> (u32, u32) {
        let tile = self.image.tile_size.max(1);
        (
            self.image.size.width.div_ceil(tile),
            self.image.size.height.div_ceil(tile),
        )
    }
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Everything needed to open a viewer session for one image.
#[derive(Clone, Debug)]
pub struct DisplayRequest {
    pub source: ImageSource,
    /// Backend-side path of the uploaded image, used for detection requests.
    /// Without it the session displays the image but never fetches heatmaps.
    pub detection_path: Option<String>,
}

impl DisplayRequest {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            detection_path: None,
        }
    }

    pub fn with_detection_path(mut self, path: impl Into<String>) -> Self {
        self.detection_path = Some(path.into());
        self
    }
}
