//! Configuration and the passed-down viewer settings context.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    API_URL_ENV, DEFAULT_API_URL, DEFAULT_DEBOUNCE, DEFAULT_OVERLAY_OPACITY,
    DEFAULT_STATIC_PREFIXES, DEFAULT_TIMEOUT_SECS, MAX_DEBOUNCE, MAX_LEVEL,
};
use crate::error::Result;
use crate::overlay::clamp_opacity;

/// Where and how to reach the backend service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Static mount points tried, in order, when resolving tile manifests.
    pub static_prefixes: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            static_prefixes: DEFAULT_STATIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Apply the `EMBIGGEN_API_URL` environment override, if set.
    pub fn with_env_override(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!(%url, "backend URL overridden from environment");
                self.base_url = url.trim().to_string();
            }
        }
        self
    }
}

/// User-adjustable viewer behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Heatmap overlay opacity (0.0..=1.0).
    pub overlay_opacity: f32,
    /// Refetch the heatmap when the level changes.
    pub auto_refresh: bool,
    /// Quiet period before a refresh, at most 60 s.
    pub debounce_ms: u64,
    pub max_level: u32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            overlay_opacity: DEFAULT_OVERLAY_OPACITY,
            auto_refresh: true,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_level: MAX_LEVEL,
        }
    }
}

impl ViewerSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn normalize(&mut self) {
        self.overlay_opacity = clamp_opacity(self.overlay_opacity);
        self.debounce_ms = self.debounce_ms.min(MAX_DEBOUNCE.as_millis() as u64);
    }
}

/// Full configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbiggenConfig {
    pub backend: BackendConfig,
    pub viewer: ViewerSettings,
}

impl EmbiggenConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.viewer.normalize();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Settings context handed down to whoever needs viewer settings. There is
/// no global instance; owners construct one and pass it along.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    current: ViewerSettings,
    revision: u64,
}

impl Settings {
    pub fn new(initial: ViewerSettings) -> Self {
        let mut current = initial;
        current.normalize();
        Self {
            current,
            revision: 0,
        }
    }

    pub fn get(&self) -> &ViewerSettings {
        &self.current
    }

    /// Bumped on every change, so readers can detect updates cheaply.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a partial update. Returns whether anything changed.
    pub fn update(&mut self, f: impl FnOnce(&mut ViewerSettings)) -> bool {
        let mut next = self.current.clone();
        f(&mut next);
        next.normalize();
        self.replace(next)
    }

    pub fn reset(&mut self) -> bool {
        self.replace(ViewerSettings::default())
    }

    fn replace(&mut self, next: ViewerSettings) -> bool {
        if next == self.current {
            return false;
        }
        self.current = next;
        self.revision += 1;
        true
    }
}
