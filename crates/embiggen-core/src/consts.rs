use std::time::Duration;

/// Highest pyramid level the estimator will report.
pub const MAX_LEVEL: u32 = 8;

/// Zoom values below this are treated as this value before taking the log.
pub const ZOOM_EPSILON: f64 = 1e-6;

/// Quiet period after the last level change before a heatmap is requested.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Longest accepted debounce window; larger settings are clamped to it.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(60);

/// Heatmap opacity used when nothing else is configured.
pub const DEFAULT_OVERLAY_OPACITY: f32 = 0.6;

/// Backend base URL used when neither config nor environment provide one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "EMBIGGEN_API_URL";

/// Static prefixes the backend may serve tile manifests under, tried in order.
pub const DEFAULT_STATIC_PREFIXES: [&str; 2] = ["/tiles", "/static"];

/// Request timeout for backend calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
