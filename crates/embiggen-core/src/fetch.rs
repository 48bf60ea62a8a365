use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::backend::DetectionBackend;
use crate::error::{EmbiggenError, Result};
use crate::refresh::{FetchOutcome, FetchTicket, RefreshRequest};

/// A finished heatmap fetch, reported back to the session's thread.
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub level: u32,
    pub outcome: FetchOutcome,
    pub elapsed: Duration,
}

/// Runs heatmap requests somewhere off the session's event loop.
pub trait HeatmapFetcher {
    fn submit(&mut self, request: RefreshRequest) -> Result<()>;

    /// Completions that arrived since the last call, in arrival order.
    fn drain(&mut self) -> Vec<FetchCompletion>;
}

/// Performs backend calls on a dedicated worker thread.
pub struct ThreadedFetcher {
    cmd_tx: mpsc::Sender<RefreshRequest>,
    result_rx: mpsc::Receiver<FetchCompletion>,
}

impl ThreadedFetcher {
    /// Spawn the worker thread. It exits once the fetcher is dropped.
    pub fn spawn<B>(backend: B) -> Result<Self>
    where
        B: DetectionBackend + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RefreshRequest>();
        let (result_tx, result_rx) = mpsc::channel::<FetchCompletion>();

        std::thread::Builder::new()
            .name("embiggen-fetch".into())
            .spawn(move || fetch_loop(backend, cmd_rx, result_tx))?;

        Ok(Self { cmd_tx, result_rx })
    }
}

impl HeatmapFetcher for ThreadedFetcher {
    fn submit(&mut self, request: RefreshRequest) -> Result<()> {
        self.cmd_tx
            .send(request)
            .map_err(|_| EmbiggenError::WorkerDisconnected)
    }

    fn drain(&mut self) -> Vec<FetchCompletion> {
        self.result_rx.try_iter().collect()
    }
}

fn fetch_loop<B: DetectionBackend>(
    backend: B,
    cmd_rx: mpsc::Receiver<RefreshRequest>,
    result_tx: mpsc::Sender<FetchCompletion>,
) {
    while let Ok(request) = cmd_rx.recv() {
        let started = Instant::now();
        let outcome = backend
            .detect_on_path(&request.source_path, request.level)
            .map_err(|e| e.to_string());
        let elapsed = started.elapsed();
        debug!(
            level = request.level,
            ok = outcome.is_ok(),
            elapsed_ms = elapsed.as_millis() as u64,
            "heatmap fetch finished"
        );
        let completion = FetchCompletion {
            ticket: request.ticket,
            level: request.level,
            outcome,
            elapsed,
        };
        if result_tx.send(completion).is_err() {
            break;
        }
    }
}
