//! Transient heatmap resource handles.
//!
//! A [`HeatmapResource`] is the in-process equivalent of a browser object URL:
//! it owns the decoded-on-demand heatmap bytes and is released exactly once,
//! when it is dropped. The [`ResourceRegistry`] that minted it keeps a live
//! count so leaked or double-released handles are observable.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;

/// Identifier the renderer uses to reference a heatmap resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "heatmap:{}", self.0)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: AtomicUsize,
}

/// Mints [`HeatmapResource`] handles and tracks how many are alive.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>) -> HeatmapResource {
        let id = ResourceId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.live.fetch_add(1, Ordering::Relaxed);
        debug!(%id, bytes = bytes.len(), "heatmap resource created");
        HeatmapResource {
            id,
            bytes: bytes.into(),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of handles created by this registry that have not been dropped.
    pub fn live_count(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }
}

/// Owned heatmap image bytes. Not `Clone`: each handle is
/// released exactly once.
#[derive(Debug)]
pub struct HeatmapResource {
    id: ResourceId,
    bytes: Arc<[u8]>,
    registry: Arc<RegistryInner>,
}

impl HeatmapResource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pixel dimensions read from the encoded image header.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let reader = image::ImageReader::new(Cursor::new(&self.bytes[..])).with_guessed_format()?;
        Ok(reader.into_dimensions()?)
    }
}

impl Drop for HeatmapResource {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::Relaxed);
        debug!(id = %self.id, "heatmap resource released");
    }
}
