//! Debounced heatmap refresh.
//!
//! Level changes restart a debounce timer; when it expires one request is
//! issued for `(source path, level)`. Only one request is in flight at a
//! time. Completions are matched against the in-flight ticket and checked
//! against the current source and level before their result is applied.
//! Time is always passed in by the caller.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::consts::MAX_DEBOUNCE;

/// Identifies one viewer session. Tickets from earlier sessions never match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub session: SessionId,
    pub generation: u64,
}

/// A heatmap fetch to run against the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshRequest {
    pub ticket: FetchTicket,
    pub source_path: String,
    pub level: u32,
}

/// Heatmap bytes, or the failure message from the backend call.
pub type FetchOutcome = std::result::Result<Vec<u8>, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Scheduled,
    Fetching,
}

impl std::fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Fetching => write!(f, "Fetching"),
        }
    }
}

/// What to do with a fetch result.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Current result: paint it.
    Apply(Vec<u8>),
    /// Request was current when issued but level, source or auto-refresh
    /// changed while it was in flight.
    Discarded,
    /// Backend call failed. Not retried.
    Failed(String),
    /// Ticket is not the one this controller is waiting for.
    Stale,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Settled {
    pub disposition: Disposition,
    /// Request parked while the previous one was in flight, now issued.
    pub follow_up: Option<RefreshRequest>,
}

#[derive(Clone, Copy, Debug)]
struct PendingTimer {
    deadline: Instant,
    level: u32,
}

#[derive(Clone, Debug)]
struct InFlight {
    ticket: FetchTicket,
    source_path: String,
    level: u32,
}

pub struct RefreshController {
    session: SessionId,
    debounce: Duration,
    auto_refresh: bool,
    source_path: Option<String>,
    level: Option<u32>,
    timer: Option<PendingTimer>,
    in_flight: Option<InFlight>,
    deferred: Option<u32>,
    generation: u64,
}

impl RefreshController {
    /// `debounce` is clamped to [`MAX_DEBOUNCE`].
    pub fn new(session: SessionId, debounce: Duration, auto_refresh: bool) -> Self {
        Self {
            session,
            debounce: debounce.min(MAX_DEBOUNCE),
            auto_refresh,
            source_path: None,
            level: None,
            timer: None,
            in_flight: None,
            deferred: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        if self.in_flight.is_some() {
            RefreshPhase::Fetching
        } else if self.timer.is_some() || self.deferred.is_some() {
            RefreshPhase::Scheduled
        } else {
            RefreshPhase::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn current_level(&self) -> Option<u32> {
        self.level
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// When the pending debounce timer fires, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    pub fn set_source(&mut self, path: Option<String>) {
        self.timer = None;
        self.deferred = None;
        self.source_path = path;
    }

    /// Record a level change and (re)start the debounce timer. Returns whether
    /// a timer is now pending.
    pub fn on_level_change(&mut self, level: u32, now: Instant) -> bool {
        self.level = Some(level);
        if !self.auto_refresh || self.source_path.is_none() {
            return false;
        }
        if self.timer.is_some() {
            debug!(level, "debounce restarted");
        }
        self.deferred = None;
        self.timer = Some(PendingTimer {
            deadline: now.checked_add(self.debounce).unwrap_or(now),
            level,
        });
        true
    }

    /// Enable or disable auto-refresh. Disabling cancels any pending timer;
    /// re-enabling schedules a refresh for the current level.
    pub fn set_auto_refresh(&mut self, enabled: bool, now: Instant) {
        if self.auto_refresh == enabled {
            return;
        }
        self.auto_refresh = enabled;
        if enabled {
            if let Some(level) = self.level {
                self.on_level_change(level, now);
            }
        } else {
            if self.timer.take().is_some() {
                debug!("pending refresh cancelled");
            }
            self.deferred = None;
        }
    }

    /// Fire the debounce timer if it has expired.
    pub fn poll(&mut self, now: Instant) -> Option<RefreshRequest> {
        let timer = self.timer?;
        if now < timer.deadline {
            return None;
        }
        self.timer = None;
        if self.in_flight.is_some() {
            debug!(level = timer.level, "refresh deferred until in-flight fetch settles");
            self.deferred = Some(timer.level);
            return None;
        }
        self.issue(timer.level)
    }

    fn issue(&mut self, level: u32) -> Option<RefreshRequest> {
        let source_path = self.source_path.clone()?;
        self.generation += 1;
        let ticket = FetchTicket {
            session: self.session,
            generation: self.generation,
        };
        debug!(level, generation = self.generation, "refresh issued");
        self.in_flight = Some(InFlight {
            ticket: ticket.clone(),
            source_path: source_path.clone(),
            level,
        });
        Some(RefreshRequest {
            ticket,
            source_path,
            level,
        })
    }

    /// Settle a fetch. Only the in-flight ticket is accepted; its result is
    /// applied only if it still matches the current source and level.
    pub fn complete(&mut self, ticket: &FetchTicket, outcome: FetchOutcome) -> Settled {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.ticket == *ticket => f,
            other => {
                self.in_flight = other;
                debug!(?ticket, "stale fetch completion ignored");
                return Settled {
                    disposition: Disposition::Stale,
                    follow_up: None,
                };
            }
        };

        let disposition = match outcome {
            Err(message) => {
                warn!(level = in_flight.level, %message, "heatmap fetch failed");
                Disposition::Failed(message)
            }
            Ok(bytes) => {
                let current = self.auto_refresh
                    && self.source_path.as_deref() == Some(in_flight.source_path.as_str())
                    && self.level == Some(in_flight.level);
                if current {
                    Disposition::Apply(bytes)
                } else {
                    debug!(level = in_flight.level, "superseded heatmap discarded");
                    Disposition::Discarded
                }
            }
        };

        let follow_up = match self.deferred.take() {
            Some(level)
                if !(level == in_flight.level && matches!(disposition, Disposition::Apply(_))) =>
            {
                self.issue(level)
            }
            _ => None,
        };

        Settled {
            disposition,
            follow_up,
        }
    }

    /// Drop the timer, any deferred request and the claim on the in-flight
    /// ticket. A late completion for that ticket is then `Stale`.
    pub fn cancel_all(&mut self) {
        self.timer = None;
        self.deferred = None;
        if let Some(f) = self.in_flight.take() {
            debug!(level = f.level, "in-flight fetch abandoned");
        }
    }
}
