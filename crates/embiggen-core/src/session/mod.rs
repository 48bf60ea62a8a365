//! Viewer session lifecycle.
//!
//! A [`ViewerSession`] owns exactly one renderer instance together with its
//! event subscriptions, acquired together in [`ViewerSession::open`] and
//! released together in [`ViewerSession::teardown`] (also run on drop).
//! Renderer events are routed through the level estimator into the refresh
//! controller; settled fetches are painted through the overlay synchronizer.

mod host;

use std::sync::{mpsc, Arc};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fetch::{FetchCompletion, HeatmapFetcher};
use crate::level::estimate_level_clamped;
use crate::overlay::{clamp_opacity, OverlaySynchronizer};
use crate::refresh::{Disposition, RefreshController, RefreshPhase, RefreshRequest, SessionId};
use crate::renderer::{
    PyramidRenderer, RendererEvent, RendererEventKind, RendererFactory, SubscriptionId,
};
use crate::resource::{HeatmapResource, ResourceId, ResourceRegistry};
use crate::settings::ViewerSettings;
use crate::source::{DisplayRequest, ImageSource};

pub use host::ViewerHost;

/// Called with the new level each time the session commits a level change.
pub type LevelCallback = Arc<dyn Fn(u32) + Send + Sync>;

const SUBSCRIBED_EVENTS: [RendererEventKind; 3] = [
    RendererEventKind::Open,
    RendererEventKind::Zoom,
    RendererEventKind::AnimationFinish,
];

pub struct ViewerSession<R: PyramidRenderer> {
    id: SessionId,
    source: ImageSource,
    renderer: Option<R>,
    subscriptions: Vec<SubscriptionId>,
    events: Option<mpsc::Receiver<RendererEvent>>,
    controller: RefreshController,
    overlay: OverlaySynchronizer,
    registry: ResourceRegistry,
    opacity: f32,
    max_level: u32,
    level: Option<u32>,
    opened: bool,
    /// Overlay requested before the renderer opened; painted on `Open`.
    pending_overlay: Option<HeatmapResource>,
    on_level_change: Option<LevelCallback>,
}

impl<R: PyramidRenderer> ViewerSession<R> {
    /// Create the renderer for `request.source` and subscribe to its events.
    /// If any subscription fails, the ones already made are undone and the
    /// renderer is destroyed before the error is returned.
    pub fn open<F>(
        id: SessionId,
        factory: &mut F,
        request: DisplayRequest,
        settings: &ViewerSettings,
        registry: ResourceRegistry,
    ) -> Result<Self>
    where
        F: RendererFactory<Renderer = R>,
    {
        let mode = request.source.open_mode();
        let mut renderer = factory.create(&request.source, mode)?;

        let (event_tx, event_rx) = mpsc::channel();
        let mut subscriptions = Vec::with_capacity(SUBSCRIBED_EVENTS.len());
        for kind in SUBSCRIBED_EVENTS {
            match renderer.subscribe(kind, event_tx.clone()) {
                Ok(sub) => subscriptions.push(sub),
                Err(e) => {
                    for sub in subscriptions {
                        renderer.unsubscribe(sub);
                    }
                    renderer.destroy();
                    return Err(e);
                }
            }
        }

        let mut controller =
            RefreshController::new(id, settings.debounce(), settings.auto_refresh);
        controller.set_source(request.detection_path.clone());

        info!(session = id.0, source = %request.source, %mode, "viewer session opened");

        Ok(Self {
            id,
            source: request.source,
            renderer: Some(renderer),
            subscriptions,
            events: Some(event_rx),
            controller,
            overlay: OverlaySynchronizer::new(),
            registry,
            opacity: clamp_opacity(settings.overlay_opacity),
            max_level: settings.max_level,
            level: None,
            opened: false,
            pending_overlay: None,
            on_level_change: None,
        })
    }

    pub fn set_level_callback(&mut self, callback: Option<LevelCallback>) {
        self.on_level_change = callback;
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Last committed level, `None` until the renderer has reported a zoom.
    pub fn level(&self) -> Option<u32> {
        self.level
    }

    /// A heatmap fetch is in flight.
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.controller.phase()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn auto_refresh(&self) -> bool {
        self.controller.auto_refresh()
    }

    /// Resource currently painted as the overlay.
    pub fn overlay_resource(&self) -> Option<ResourceId> {
        self.overlay.resource_id()
    }

    /// The renderer has been created and not yet torn down.
    pub fn is_live(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    /// Current viewport zoom, `None` once torn down.
    pub fn zoom(&self) -> Option<f64> {
        self.renderer.as_ref().map(|r| r.zoom())
    }

    /// Process queued renderer events in emission order, then fire the
    /// debounce timer if it is due. Every queued event is handled even if an
    /// earlier one fails; the first error is returned.
    pub fn pump(&mut self, now: Instant, fetcher: &mut dyn HeatmapFetcher) -> Result<()> {
        let events: Vec<RendererEvent> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => return Ok(()),
        };
        let mut first_err = None;
        for event in events {
            if let Err(e) = self.handle_event(event, now) {
                warn!(session = self.id.0, error = %e, "renderer event failed");
                first_err.get_or_insert(e);
            }
        }
        if let Some(request) = self.controller.poll(now) {
            if let Err(e) = self.submit(request, fetcher) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn handle_event(&mut self, event: RendererEvent, now: Instant) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        // Overlay work on open must not hold back the level commit below.
        let painted = match event {
            RendererEvent::Open { .. } => {
                self.opened = true;
                let realigned = self.overlay.realign(renderer);
                match self.pending_overlay.take() {
                    Some(resource) => realigned.and(self.overlay.set_overlay(
                        renderer,
                        Some(resource),
                        self.opacity,
                    )),
                    None => realigned,
                }
            }
            _ => Ok(()),
        };

        let level = estimate_level_clamped(event.zoom(), self.max_level);
        if self.level != Some(level) {
            debug!(session = self.id.0, level, zoom = event.zoom(), "level committed");
            self.level = Some(level);
            if let Some(callback) = &self.on_level_change {
                callback(level);
            }
            self.controller.on_level_change(level, now);
        }
        painted
    }

    fn submit(&mut self, request: RefreshRequest, fetcher: &mut dyn HeatmapFetcher) -> Result<()> {
        let ticket = request.ticket.clone();
        if let Err(e) = fetcher.submit(request) {
            // Release the in-flight slot so the next level change can retry.
            self.controller.complete(&ticket, Err(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    /// Settle a fetch completion. Results for other sessions, superseded
    /// requests or failed calls leave the renderer untouched. A failure to
    /// submit the follow-up request does not prevent the result from being
    /// applied; the first error is returned.
    pub fn handle_completion(
        &mut self,
        completion: FetchCompletion,
        fetcher: &mut dyn HeatmapFetcher,
    ) -> Result<()> {
        let settled = self
            .controller
            .complete(&completion.ticket, completion.outcome);

        let submitted = match settled.follow_up {
            Some(request) => self.submit(request, fetcher),
            None => Ok(()),
        };

        let applied = match (settled.disposition, self.renderer.as_mut()) {
            (Disposition::Apply(bytes), Some(renderer)) => {
                let resource = self.registry.create(bytes);
                let painted = if self.opened {
                    self.overlay
                        .set_overlay(renderer, Some(resource), self.opacity)
                } else {
                    self.pending_overlay = Some(resource);
                    Ok(())
                };
                if painted.is_ok() {
                    info!(
                        session = self.id.0,
                        level = completion.level,
                        elapsed_ms = completion.elapsed.as_millis() as u64,
                        "heatmap applied"
                    );
                }
                painted
            }
            _ => Ok(()),
        };
        submitted.and(applied)
    }

    pub fn set_overlay_opacity(&mut self, opacity: f32) -> Result<()> {
        self.opacity = clamp_opacity(opacity);
        match self.renderer.as_mut() {
            Some(renderer) => self.overlay.set_opacity(renderer, self.opacity),
            None => Ok(()),
        }
    }

    pub fn set_auto_refresh(&mut self, enabled: bool, now: Instant) {
        self.controller.set_auto_refresh(enabled, now);
    }

    /// Paint `resource` as the overlay, or remove the overlay with `None`.
    /// Before the renderer has opened, the resource is held and painted on
    /// `Open`.
    pub fn set_overlay(&mut self, resource: Option<HeatmapResource>) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        if !self.opened {
            self.pending_overlay = resource;
            return Ok(());
        }
        self.overlay.set_overlay(renderer, resource, self.opacity)
    }

    pub fn clear_overlay(&mut self) -> Result<()> {
        self.set_overlay(None)
    }

    /// Unsubscribe, cancel timers, clear the overlay and destroy the
    /// renderer. Safe to call more than once.
    pub fn teardown(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };
        for sub in self.subscriptions.drain(..) {
            renderer.unsubscribe(sub);
        }
        self.events = None;
        self.controller.cancel_all();
        self.overlay.clear(&mut renderer);
        self.pending_overlay = None;
        renderer.destroy();
        info!(session = self.id.0, "viewer session torn down");
    }
}

impl<R: PyramidRenderer> Drop for ViewerSession<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
