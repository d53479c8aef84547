//! Shared lesson timer.
//!
//! Each session owns at most one timer. The teacher starts, pauses, and
//! stops it; every bound connection receives a `timer_update` broadcast
//! once per second while it runs. Elapsed time survives pause/resume
//! cycles: pausing folds the running interval into an accumulator and a
//! later start resumes from there.

use std::sync::Arc;
use std::time::Duration;

use tandem_protocol::ServerFrame;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::registry::SessionRegistry;

/// Broadcast cadence while the timer runs.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-session timer record, stored inside the session state.
pub struct TimerState {
    /// When the current running interval began. Meaningless while paused.
    started_at: Instant,
    /// Elapsed time folded in from previous running intervals.
    accumulated: Duration,
    /// Whether a tick task is currently driving broadcasts.
    running: bool,
    /// Cancels the tick task on pause, stop, or shutdown.
    cancel: CancellationToken,
}

impl TimerState {
    fn started_now() -> Self {
        Self {
            started_at: Instant::now(),
            accumulated: Duration::ZERO,
            running: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Total elapsed time, including the in-flight interval if running.
    pub fn elapsed(&self) -> Duration {
        if self.running {
            self.accumulated + self.started_at.elapsed()
        } else {
            self.accumulated
        }
    }

    /// Elapsed whole seconds, as broadcast to clients.
    pub fn seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

/// Drives timer lifecycle and per-second broadcasts for all sessions.
pub struct TimerEngine {
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl TimerEngine {
    /// Create an engine over the given registry.
    ///
    /// Cancelling `shutdown` stops every tick task.
    pub fn new(registry: Arc<SessionRegistry>, shutdown: CancellationToken) -> Self {
        Self { registry, shutdown }
    }

    /// Start (or resume) the session timer.
    ///
    /// No-op if the timer is already running. Broadcasts the current
    /// reading immediately, then once per second from the tick task.
    pub fn start(&self, session_id: &str) {
        let session = self.registry.ensure(session_id);
        let started = session.with_timer(|slot| match slot {
            Some(timer) if timer.running => false,
            Some(timer) => {
                timer.started_at = Instant::now();
                timer.running = true;
                timer.cancel = CancellationToken::new();
                true
            }
            None => {
                *slot = Some(TimerState::started_now());
                true
            }
        });
        if !started {
            return;
        }

        debug!(session_id, "timer started");
        self.broadcast_reading(session_id);
        self.spawn_tick_task(session_id.to_owned());
    }

    /// Pause the session timer, freezing the elapsed reading.
    ///
    /// No-op if there is no timer or it is already paused.
    pub fn pause(&self, session_id: &str) {
        let Some(session) = self.registry.get(session_id) else {
            return;
        };
        let paused = session.with_timer(|slot| match slot {
            Some(timer) if timer.running => {
                timer.accumulated += timer.started_at.elapsed();
                timer.running = false;
                timer.cancel.cancel();
                true
            }
            _ => false,
        });
        if paused {
            debug!(session_id, "timer paused");
            self.broadcast_reading(session_id);
        }
    }

    /// Stop and discard the session timer, broadcasting a zero reading.
    ///
    /// No-op if there is no timer.
    pub fn stop(&self, session_id: &str) {
        let Some(session) = self.registry.get(session_id) else {
            return;
        };
        let existed = session.with_timer(|slot| {
            if let Some(timer) = slot.take() {
                timer.cancel.cancel();
                true
            } else {
                false
            }
        });
        if existed {
            debug!(session_id, "timer stopped");
            self.registry
                .broadcast(session_id, &ServerFrame::timer_update(0));
        }
    }

    /// Current elapsed seconds for the session, zero if no timer exists.
    pub fn current_seconds(&self, session_id: &str) -> u64 {
        self.registry
            .get(session_id)
            .map_or(0, |s| s.with_timer(|slot| slot.as_ref().map_or(0, TimerState::seconds)))
    }

    fn broadcast_reading(&self, session_id: &str) {
        let seconds = self.current_seconds(session_id);
        self.registry
            .broadcast(session_id, &ServerFrame::timer_update(seconds));
    }

    fn spawn_tick_task(&self, session_id: String) {
        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.clone();
        let cancel = self
            .registry
            .get(&session_id)
            .and_then(|s| s.with_timer(|slot| slot.as_ref().map(|t| t.cancel.clone())));
        let Some(cancel) = cancel else {
            return;
        };

        drop(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // The first tick fires immediately; the start path already
            // broadcast the current reading, so skip it.
            let _ = interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    () = cancel.cancelled() => break,
                    () = shutdown.cancelled() => break,
                }
                // Re-resolve each tick so a stopped timer ends the task
                // even if cancellation raced.
                let Some(session) = registry.get(&session_id) else {
                    break;
                };
                let seconds = session.with_timer(|slot| match slot {
                    Some(timer) if timer.running => Some(timer.seconds()),
                    _ => None,
                });
                match seconds {
                    Some(seconds) => {
                        registry.broadcast(&session_id, &ServerFrame::timer_update(seconds));
                    }
                    None => break,
                }
            }
        }));
    }
}
