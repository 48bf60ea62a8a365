use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::fetch::HeatmapFetcher;
use crate::refresh::SessionId;
use crate::renderer::RendererFactory;
use crate::resource::ResourceRegistry;
use crate::settings::{Settings, ViewerSettings};
use crate::source::DisplayRequest;

use super::{LevelCallback, ViewerSession};

/// Owns the displayed session and the fetcher shared by successive
/// sessions. Replacing the image always tears the old session down before
/// the new renderer is created.
pub struct ViewerHost<F: RendererFactory, H: HeatmapFetcher> {
    factory: F,
    fetcher: H,
    settings: Settings,
    registry: ResourceRegistry,
    session: Option<ViewerSession<F::Renderer>>,
    next_session: u64,
    on_level_change: Option<LevelCallback>,
}

impl<F: RendererFactory, H: HeatmapFetcher> ViewerHost<F, H> {
    pub fn new(factory: F, fetcher: H, settings: Settings) -> Self {
        Self {
            factory,
            fetcher,
            settings,
            registry: ResourceRegistry::new(),
            session: None,
            next_session: 0,
            on_level_change: None,
        }
    }

    /// Callback for committed level changes, applied to the current and all
    /// later sessions.
    pub fn set_level_callback(&mut self, callback: Option<LevelCallback>) {
        if let Some(session) = self.session.as_mut() {
            session.set_level_callback(callback.clone());
        }
        self.on_level_change = callback;
    }

    /// Show a new image. The previous session, if any, is fully torn down
    /// first.
    pub fn display(&mut self, request: DisplayRequest) -> Result<SessionId> {
        self.close();

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let mut session = ViewerSession::open(
            id,
            &mut self.factory,
            request,
            self.settings.get(),
            self.registry.clone(),
        )?;
        session.set_level_callback(self.on_level_change.clone());
        self.session = Some(session);
        Ok(id)
    }

    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }

    /// Drive the current session: renderer events, due timers, then fetch
    /// completions. Completions arriving with no session are dropped. Every
    /// drained event and completion is handled even when one of them fails,
    /// so an in-flight fetch is always settled; the first error is returned.
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        let completions = self.fetcher.drain();
        let Some(session) = self.session.as_mut() else {
            if !completions.is_empty() {
                debug!(count = completions.len(), "fetch completions dropped, no session");
            }
            return Ok(());
        };

        let mut first_err = session.pump(now, &mut self.fetcher).err();
        for completion in completions {
            if let Err(e) = session.handle_completion(completion, &mut self.fetcher) {
                warn!(session = session.id().0, error = %e, "fetch completion failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Update viewer settings. Opacity and auto-refresh take effect on the
    /// current session; debounce and level range apply from the next one.
    pub fn update_settings(
        &mut self,
        now: Instant,
        f: impl FnOnce(&mut ViewerSettings),
    ) -> Result<bool> {
        if !self.settings.update(f) {
            return Ok(false);
        }
        let current = self.settings.get();
        if let Some(session) = self.session.as_mut() {
            session.set_auto_refresh(current.auto_refresh, now);
            session.set_overlay_opacity(current.overlay_opacity)?;
        }
        Ok(true)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> Option<&ViewerSession<F::Renderer>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ViewerSession<F::Renderer>> {
        self.session.as_mut()
    }

    pub fn level(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.level())
    }

    pub fn is_busy(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_busy())
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: RendererFactory, H: HeatmapFetcher> Drop for ViewerHost<F, H> {
    fn drop(&mut self) {
        self.close();
    }
}
