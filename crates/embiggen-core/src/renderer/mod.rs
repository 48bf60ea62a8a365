//! Seam to the external deep-zoom pyramid renderer.
//!
//! The renderer itself (tile loading, painting, gestures) lives outside this
//! crate. Sessions only need the narrow contract below: zoom and geometry
//! queries, event subscription, and a single kind of overlay element.

mod headless;

use std::sync::mpsc;

use crate::error::Result;
use crate::geometry::{ContentSize, ImageRect, ViewportRect};
use crate::resource::ResourceId;
use crate::source::{ImageSource, OpenMode};

pub use headless::{HeadlessFactory, HeadlessHandle, HeadlessRenderer};

/// Renderer events a session can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RendererEventKind {
    Open,
    Zoom,
    AnimationFinish,
}

/// An event emitted by the renderer, carrying the viewport zoom at emission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RendererEvent {
    Open { zoom: f64 },
    Zoom { zoom: f64 },
    AnimationFinish { zoom: f64 },
}

impl RendererEvent {
    pub fn kind(&self) -> RendererEventKind {
        match self {
            Self::Open { .. } => RendererEventKind::Open,
            Self::Zoom { .. } => RendererEventKind::Zoom,
            Self::AnimationFinish { .. } => RendererEventKind::AnimationFinish,
        }
    }

    pub fn zoom(&self) -> f64 {
        match *self {
            Self::Open { zoom } | Self::Zoom { zoom } | Self::AnimationFinish { zoom } => zoom,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

/// Overlay element as handed to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    pub resource: ResourceId,
    pub location: ViewportRect,
    pub opacity: f32,
}

pub trait PyramidRenderer {
    /// Current viewport zoom factor.
    fn zoom(&self) -> f64;

    /// Full-resolution content size, or `None` until the source has opened.
    fn content_size(&self) -> Option<ContentSize>;

    /// Map an image-space rectangle to viewport coordinates.
    fn image_to_viewport_rect(&self, rect: ImageRect) -> Option<ViewportRect> {
        self.content_size()
            .map(|size| ViewportRect::from_image_rect(rect, size))
    }

    /// Deliver events of `kind` to `sink` until unsubscribed.
    fn subscribe(
        &mut self,
        kind: RendererEventKind,
        sink: mpsc::Sender<RendererEvent>,
    ) -> Result<SubscriptionId>;

    fn unsubscribe(&mut self, id: SubscriptionId);

    fn add_overlay(&mut self, element: OverlayElement) -> Result<OverlayId>;

    fn update_overlay(&mut self, id: OverlayId, element: OverlayElement) -> Result<()>;

    fn remove_overlay(&mut self, id: OverlayId);

    /// Release everything the renderer holds. The instance is unusable after.
    fn destroy(&mut self);
}

/// Creates renderer instances for a session.
pub trait RendererFactory {
    type Renderer: PyramidRenderer;

    fn create(&mut self, source: &ImageSource, mode: OpenMode) -> Result<Self::Renderer>;
}
