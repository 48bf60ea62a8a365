use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EmbiggenError, Result};
use crate::settings::BackendConfig;

use super::{
    Annotation, AnnotationShape, DeleteResponse, DetectionBackend, HealthStatus, TilesResponse,
    UploadResponse,
};

#[derive(Serialize)]
struct ImagePathBody<'a> {
    image_path: &'a str,
}

/// Blocking HTTP client for the backend service.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    static_prefixes: Vec<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EmbiggenError::InvalidUrl(config.base_url.clone()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("embiggen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            static_prefixes: config.static_prefixes.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = check_status(self.client.get(&url).send()?)?;
        Ok(response.json()?)
    }

    fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path);
        let response = check_status(self.client.post(&url).json(body).send()?)?;
        Ok(response.json()?)
    }

    pub fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health")
    }

    /// Upload an image file as multipart field `image`.
    pub fn upload(&self, file: &Path) -> Result<UploadResponse> {
        let form = multipart::Form::new().file("image", file)?;
        self.upload_form(form)
    }

    fn upload_form(&self, form: multipart::Form) -> Result<UploadResponse> {
        let url = self.endpoint("/upload");
        let response = check_status(self.client.post(&url).multipart(form).send()?)?;
        let uploaded: UploadResponse = response.json()?;
        info!(path = %uploaded.path, "image uploaded");
        Ok(uploaded)
    }

    pub fn generate_tiles(&self, image_path: &str) -> Result<TilesResponse> {
        let tiles: TilesResponse =
            self.post_json("/generate-tiles", &ImagePathBody { image_path })?;
        info!(dzi_path = %tiles.dzi_path, "tiles generated");
        Ok(tiles)
    }

    /// `HEAD` check. `Ok(false)` only for 404; other failures are errors.
    pub fn manifest_exists(&self, url: &str) -> Result<bool> {
        let response = self.client.head(url).send()?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(EmbiggenError::HttpStatus {
                status: s.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// Absolute URL of a generated manifest, trying each static prefix in
    /// order until one exists.
    pub fn resolve_manifest_url(&self, dzi_path: &str) -> Result<String> {
        let candidates = manifest_candidates(&self.base_url, &self.static_prefixes, dzi_path);
        for url in &candidates {
            if self.manifest_exists(url)? {
                debug!(%url, "manifest found");
                return Ok(url.clone());
            }
            warn!(%url, "manifest not found, trying next prefix");
        }
        Err(EmbiggenError::ManifestNotFound { tried: candidates })
    }

    /// Heatmap for a sample image id, served or generated by the backend.
    pub fn detect(&self, image_id: &str, level: u32) -> Result<Vec<u8>> {
        let url = self.endpoint("/detect");
        let level = level.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("image_id", image_id), ("level", level.as_str())])
            .send()?;
        Ok(check_status(response)?.bytes()?.to_vec())
    }

    pub fn annotations(&self) -> Result<Vec<Annotation>> {
        self.get_json("/annotations")
    }

    pub fn add_annotation(&self, shape: AnnotationShape) -> Result<Annotation> {
        self.post_json("/annotations", &shape)
    }

    pub fn clear_annotations(&self) -> Result<bool> {
        let url = self.endpoint("/annotations");
        let response = check_status(self.client.delete(&url).send()?)?;
        let deleted: DeleteResponse = response.json()?;
        Ok(deleted.deleted)
    }
}

impl DetectionBackend for HttpBackend {
    fn detect_on_path(&self, image_path: &str, level: u32) -> Result<Vec<u8>> {
        let url = self.endpoint("/detect-on-path");
        let response = self
            .client
            .post(&url)
            .query(&[("level", level)])
            .json(&ImagePathBody { image_path })
            .send()?;
        Ok(check_status(response)?.bytes()?.to_vec())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EmbiggenError::HttpStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Candidate absolute URLs for a manifest path, one per static prefix, in
/// lookup order and without duplicates. Absolute URLs are returned as-is.
pub fn manifest_candidates(base_url: &str, prefixes: &[String], dzi_path: &str) -> Vec<String> {
    if dzi_path.starts_with("http://") || dzi_path.starts_with("https://") {
        return vec![dzi_path.to_string()];
    }

    let base = base_url.trim_end_matches('/');
    let relative = dzi_path.trim_start_matches('/');
    let mut candidates: Vec<String> = Vec::with_capacity(prefixes.len().max(1));

    for prefix in prefixes {
        let prefix = prefix.trim_matches('/');
        // The backend sometimes already includes its mount point in the path.
        let rest = match relative.strip_prefix(prefix) {
            Some(r) if !prefix.is_empty() && r.starts_with('/') => r.trim_start_matches('/'),
            _ => relative,
        };
        let url = if prefix.is_empty() {
            format!("{base}/{rest}")
        } else {
            format!("{base}/{prefix}/{rest}")
        };
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    }

    if candidates.is_empty() {
        candidates.push(format!("{base}/{relative}"));
    }
    candidates
}
