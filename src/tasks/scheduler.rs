//! Periodic tick loop driving a running timer

use std::{ops::ControlFlow, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed tick cadence
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// A running tick loop and the token that cancels it
#[derive(Debug)]
struct TickLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cancellable periodic notifier; at most one tick loop is alive at a time
#[derive(Debug)]
pub struct Scheduler {
    period: Duration,
    active: Option<TickLoop>,
}

impl Scheduler {
    /// Create an idle scheduler ticking every [`TICK_PERIOD`]
    pub fn new() -> Self {
        Self { period: TICK_PERIOD, active: None }
    }

    /// Whether a tick loop is currently alive
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|tick_loop| !tick_loop.handle.is_finished())
    }

    /// Spawn the tick loop unless one is already running.
    ///
    /// `on_tick` runs once per period; returning `ControlFlow::Break` ends the
    /// loop from the inside (e.g. a countdown that reached zero).
    /// Returns false when a loop was already active.
    pub fn start<F>(&mut self, on_tick: F) -> bool
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        if self.is_active() {
            debug!("Scheduler already active, ignoring start");
            return false;
        }

        // A finished loop may still be parked here; make sure it cannot linger
        if let Some(stale) = self.active.take() {
            stale.cancel.cancel();
        }

        // Anchor the cadence to the start call, not to the task's first poll
        let first_tick = Instant::now() + self.period;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(first_tick, self.period, cancel.clone(), on_tick));
        self.active = Some(TickLoop { cancel, handle });
        debug!("Scheduler started with {:?} period", self.period);
        true
    }

    /// Cancel the tick loop and wait for it to exit
    pub async fn stop(&mut self) {
        let Some(tick_loop) = self.active.take() else {
            return;
        };

        tick_loop.cancel.cancel();
        if let Err(e) = tick_loop.handle.await {
            warn!("Tick loop ended abnormally: {}", e);
        }
        debug!("Scheduler stopped");
    }

    /// Stop any existing loop, then start a new one
    pub async fn restart<F>(&mut self, on_tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.stop().await;
        self.start(on_tick);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(tick_loop) = self.active.take() {
            tick_loop.cancel.cancel();
        }
    }
}

async fn tick_loop<F>(first_tick: Instant, period: Duration, cancel: CancellationToken, mut on_tick: F)
where
    F: FnMut() -> ControlFlow<()>,
{
    let mut interval = interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = interval.tick() => {
                // Cancellation may have raced with the wake-up
                if cancel.is_cancelled() {
                    break;
                }
                if on_tick().is_break() {
                    debug!("Tick loop finished on its own");
                    break;
                }
            }
        }
    }
}
