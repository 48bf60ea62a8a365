use tracing::debug;

use crate::error::{EmbiggenError, Result};
use crate::geometry::ViewportRect;
use crate::renderer::{OverlayElement, OverlayId, PyramidRenderer};
use crate::resource::{HeatmapResource, ResourceId};

/// Clamp an opacity to `[0, 1]`; NaN becomes fully transparent.
pub fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

struct ActiveOverlay {
    id: OverlayId,
    resource: HeatmapResource,
    location: ViewportRect,
    opacity: f32,
}

impl ActiveOverlay {
    fn element(&self) -> OverlayElement {
        OverlayElement {
            resource: self.resource.id(),
            location: self.location,
            opacity: self.opacity,
        }
    }
}

/// Keeps at most one heatmap overlay on a renderer, covering the full image.
#[derive(Default)]
pub struct OverlaySynchronizer {
    active: Option<ActiveOverlay>,
}

impl OverlaySynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn resource_id(&self) -> Option<ResourceId> {
        self.active.as_ref().map(|a| a.resource.id())
    }

    pub fn opacity(&self) -> Option<f32> {
        self.active.as_ref().map(|a| a.opacity)
    }

    /// Show `resource` at `opacity`, or remove the overlay when `resource` is
    /// `None`. An existing overlay element is updated in place; the resource it
    /// held is released.
    pub fn set_overlay<R: PyramidRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        resource: Option<HeatmapResource>,
        opacity: f32,
    ) -> Result<()> {
        let Some(resource) = resource else {
            self.clear(renderer);
            return Ok(());
        };

        let opacity = clamp_opacity(opacity);
        let location = full_content_rect(renderer)?;
        let element = OverlayElement {
            resource: resource.id(),
            location,
            opacity,
        };

        match self.active.as_mut() {
            Some(active) => {
                renderer.update_overlay(active.id, element)?;
                debug!(overlay = active.id.0, resource = %resource.id(), opacity, "overlay updated");
                active.resource = resource;
                active.location = location;
                active.opacity = opacity;
            }
            None => {
                let id = renderer.add_overlay(element)?;
                debug!(overlay = id.0, resource = %resource.id(), opacity, "overlay created");
                self.active = Some(ActiveOverlay {
                    id,
                    resource,
                    location,
                    opacity,
                });
            }
        }
        Ok(())
    }

    /// Change only the opacity of the existing overlay, if any.
    pub fn set_opacity<R: PyramidRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        opacity: f32,
    ) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.opacity = clamp_opacity(opacity);
            renderer.update_overlay(active.id, active.element())?;
        }
        Ok(())
    }

    /// Recompute the overlay rectangle from the renderer's current geometry.
    pub fn realign<R: PyramidRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.location = full_content_rect(renderer)?;
            renderer.update_overlay(active.id, active.element())?;
        }
        Ok(())
    }

    /// Remove the overlay element and release its resource. No-op when there
    /// is none.
    pub fn clear<R: PyramidRenderer + ?Sized>(&mut self, renderer: &mut R) {
        if let Some(active) = self.active.take() {
            renderer.remove_overlay(active.id);
            debug!(overlay = active.id.0, "overlay removed");
        }
    }
}

fn full_content_rect<R: PyramidRenderer + ?Sized>(renderer: &R) -> Result<ViewportRect> {
    let size = renderer
        .content_size()
        .ok_or(EmbiggenError::RendererNotReady)?;
    renderer
        .image_to_viewport_rect(size.full_rect())
        .ok_or(EmbiggenError::RendererNotReady)
}
