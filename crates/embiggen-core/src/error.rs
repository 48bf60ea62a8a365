use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbiggenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Manifest not found (tried: {})", tried.join(", "))]
    ManifestNotFound { tried: Vec<String> },

    #[error("Invalid pyramid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Renderer has no content loaded yet")]
    RendererNotReady,

    #[error("Invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Fetch worker disconnected")]
    WorkerDisconnected,
}

pub type Result<T> = std::result::Result<T, EmbiggenError>;
