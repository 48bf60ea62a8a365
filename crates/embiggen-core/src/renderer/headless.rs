use std::collections::BTreeMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{EmbiggenError, Result};
use crate::geometry::ContentSize;
use crate::source::{ImageSource, OpenMode};

use super::{
    OverlayElement, OverlayId, PyramidRenderer, RendererEvent, RendererEventKind, RendererFactory,
    SubscriptionId,
};

struct Instance {
    source: ImageSource,
    mode: OpenMode,
    content_size: ContentSize,
    zoom: f64,
    opened: bool,
    subscriptions: BTreeMap<SubscriptionId, (RendererEventKind, mpsc::Sender<RendererEvent>)>,
    overlays: BTreeMap<OverlayId, OverlayElement>,
    next_id: u64,
}

impl Instance {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn emit(&self, event: RendererEvent) {
        for (kind, sink) in self.subscriptions.values() {
            if *kind == event.kind() {
                // Receiver gone means the subscriber is tearing down.
                let _ = sink.send(event);
            }
        }
    }
}

#[derive(Default)]
struct World {
    default_size: Option<ContentSize>,
    fail_create: Option<String>,
    next_instance: u64,
    created: usize,
    live: BTreeMap<u64, Instance>,
}

/// In-memory renderer used by the CLI and tests. It loads nothing; it keeps
/// the state a real viewer would expose and lets the driver emit events.
#[derive(Clone)]
pub struct HeadlessFactory {
    world: Arc<Mutex<World>>,
}

fn lock(world: &Mutex<World>) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(|e| e.into_inner())
}

impl HeadlessFactory {
    /// `default_size` is used for URL sources; descriptors carry their own.
    pub fn new(default_size: ContentSize) -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                default_size: Some(default_size),
                ..World::default()
            })),
        }
    }

    /// Make the next `create` calls fail with `message` (or succeed again
    /// with `None`).
    pub fn set_fail_create(&self, message: Option<String>) {
        lock(&self.world).fail_create = message;
    }

    /// Renderer instances created and not yet destroyed.
    pub fn live_instances(&self) -> usize {
        lock(&self.world).live.len()
    }

    /// Renderer instances created over the factory's lifetime.
    pub fn created(&self) -> usize {
        lock(&self.world).created
    }

    /// Handle to the most recently created live instance.
    pub fn latest(&self) -> Option<HeadlessHandle> {
        let world = lock(&self.world);
        world.live.keys().next_back().map(|&instance| HeadlessHandle {
            world: Arc::clone(&self.world),
            instance,
        })
    }
}

impl RendererFactory for HeadlessFactory {
    type Renderer = HeadlessRenderer;

    fn create(&mut self, source: &ImageSource, mode: OpenMode) -> Result<HeadlessRenderer> {
        let mut world = lock(&self.world);
        if let Some(message) = world.fail_create.clone() {
            return Err(EmbiggenError::Renderer(message));
        }
        let content_size = match source {
            ImageSource::Descriptor(d) => d.content_size(),
            _ => world
                .default_size
                .ok_or_else(|| EmbiggenError::Renderer("no content size configured".into()))?,
        };
        world.next_instance += 1;
        world.created += 1;
        let instance = world.next_instance;
        world.live.insert(
            instance,
            Instance {
                source: source.clone(),
                mode,
                content_size,
                zoom: 1.0,
                opened: false,
                subscriptions: BTreeMap::new(),
                overlays: BTreeMap::new(),
                next_id: 0,
            },
        );
        debug!(instance, %mode, "headless renderer created");
        Ok(HeadlessRenderer {
            world: Arc::clone(&self.world),
            instance,
            destroyed: false,
        })
    }
}

/// Driver-side view of one headless renderer instance.
#[derive(Clone)]
pub struct HeadlessHandle {
    world: Arc<Mutex<World>>,
    instance: u64,
}

impl HeadlessHandle {
    fn with<T>(&self, f: impl FnOnce(&mut Instance) -> T) -> Option<T> {
        lock(&self.world).live.get_mut(&self.instance).map(f)
    }

    pub fn is_alive(&self) -> bool {
        self.with(|_| ()).is_some()
    }

    /// Finish loading the source and emit `Open`.
    pub fn open(&self) {
        self.with(|inst| {
            inst.opened = true;
            inst.emit(RendererEvent::Open { zoom: inst.zoom });
        });
    }

    /// Set the zoom and emit `Zoom`.
    pub fn zoom_to(&self, zoom: f64) {
        self.with(|inst| {
            inst.zoom = zoom;
            inst.emit(RendererEvent::Zoom { zoom });
        });
    }

    /// Emit `AnimationFinish` at the current zoom.
    pub fn finish_animation(&self) {
        self.with(|inst| inst.emit(RendererEvent::AnimationFinish { zoom: inst.zoom }));
    }

    pub fn zoom(&self) -> Option<f64> {
        self.with(|inst| inst.zoom)
    }

    pub fn mode(&self) -> Option<OpenMode> {
        self.with(|inst| inst.mode)
    }

    pub fn source(&self) -> Option<ImageSource> {
        self.with(|inst| inst.source.clone())
    }

    pub fn overlays(&self) -> Vec<OverlayElement> {
        self.with(|inst| inst.overlays.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscription_count(&self) -> usize {
        self.with(|inst| inst.subscriptions.len()).unwrap_or(0)
    }
}

/// Renderer instance owned by a session.
pub struct HeadlessRenderer {
    world: Arc<Mutex<World>>,
    instance: u64,
    destroyed: bool,
}

impl HeadlessRenderer {
    fn with<T>(&self, f: impl FnOnce(&mut Instance) -> T) -> Result<T> {
        lock(&self.world)
            .live
            .get_mut(&self.instance)
            .map(f)
            .ok_or_else(|| EmbiggenError::Renderer(format!("renderer {} destroyed", self.instance)))
    }
}

impl PyramidRenderer for HeadlessRenderer {
    fn zoom(&self) -> f64 {
        self.with(|inst| inst.zoom).unwrap_or(1.0)
    }

    fn content_size(&self) -> Option<ContentSize> {
        self.with(|inst| inst.opened.then_some(inst.content_size))
            .ok()
            .flatten()
    }

    fn subscribe(
        &mut self,
        kind: RendererEventKind,
        sink: mpsc::Sender<RendererEvent>,
    ) -> Result<SubscriptionId> {
        self.with(|inst| {
            let id = SubscriptionId(inst.next_id());
            inst.subscriptions.insert(id, (kind, sink));
            id
        })
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let _ = self.with(|inst| inst.subscriptions.remove(&id));
    }

    fn add_overlay(&mut self, element: OverlayElement) -> Result<OverlayId> {
        self.with(|inst| {
            let id = OverlayId(inst.next_id());
            inst.overlays.insert(id, element);
            id
        })
    }

    fn update_overlay(&mut self, id: OverlayId, element: OverlayElement) -> Result<()> {
        self.with(|inst| match inst.overlays.get_mut(&id) {
            Some(existing) => {
                *existing = element;
                Ok(())
            }
            None => Err(EmbiggenError::Renderer(format!("unknown overlay {}", id.0))),
        })?
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        let _ = self.with(|inst| inst.overlays.remove(&id));
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        lock(&self.world).live.remove(&self.instance);
        debug!(instance = self.instance, "headless renderer destroyed");
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        self.destroy();
    }
}
