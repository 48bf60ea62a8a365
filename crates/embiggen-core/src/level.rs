use crate::consts::{MAX_LEVEL, ZOOM_EPSILON};

/// Pyramid level appropriate for the given viewport zoom, clamped to
/// `[0, MAX_LEVEL]`.
pub fn estimate_level(zoom: f64) -> u32 {
    estimate_level_clamped(zoom, MAX_LEVEL)
}

/// Pyramid level for `zoom`: `round(log2(zoom))` clamped to `[0, max_level]`.
///
/// Zero, negative and NaN zoom values are treated as [`ZOOM_EPSILON`] and so
/// land on level 0.
pub fn estimate_level_clamped(zoom: f64, max_level: u32) -> u32 {
    let zoom = if zoom.is_nan() { ZOOM_EPSILON } else { zoom.max(ZOOM_EPSILON) };
    let level = zoom.log2().round();
    if level <= 0.0 {
        0
    } else {
        // f64 -> u32 casts saturate, so +inf ends up at max_level too.
        (level as u32).min(max_level)
    }
}

/// Magnification a level stands for (`2^level`).
pub fn level_scale(level: u32) -> f64 {
    2f64.powi(level as i32)
}
