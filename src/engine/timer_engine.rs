//! Timer state machine and time reconciliation
//!
//! The engine never reads the clock itself: every time-dependent operation
//! takes `now`, so the host decides where time comes from. Displayed values
//! advance by one tenth per tick while running, and are recomputed in closed
//! form from the anchor timestamps after any gap (pause, suspension, restore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DisplayTime, Snapshot, TimerError, SNAPSHOT_VERSION};

/// Longest countdown whose total still fits in `i64` milliseconds
pub const MAX_COUNTDOWN_SECONDS: u64 = (i64::MAX / 1000) as u64;

/// Counting direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Elapsed time counting up from zero without bound
    #[default]
    CountUp,
    /// Remaining time counting down from a configured duration to zero
    CountDown,
}

/// Result of a start/pause command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Counting (re)started. `first_start` carries the actual start time on the
    /// first start after a reset, and is `None` when resuming from a pause.
    Started { first_start: Option<DateTime<Utc>> },
    /// Counting paused with time left (or elapsed) on the clock
    Paused,
    /// A countdown was paused at or past zero and is now finished
    Completed,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The engine is not running; nothing changed
    Idle,
    Advanced(DisplayTime),
    /// The countdown reached zero on this tick and stopped
    Completed(DisplayTime),
}

/// Result of resuming after a host suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not running, or the gap was already reconciled by a restore
    Skipped,
    Adjusted(DisplayTime),
    /// The countdown ran out while the host was suspended
    Completed,
}

/// Stopwatch / countdown state machine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerEngine {
    mode: Mode,
    running: bool,
    ever_started: bool,
    display: DisplayTime,
    countdown_total_seconds: u64,
    /// When counting began after the last reset
    actual_start: Option<DateTime<Utc>>,
    /// `actual_start` pushed forward by the time spent paused
    adjusted_start: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    suspended_at: Option<DateTime<Utc>>,
    /// Last closed-form correction from a restore or resume
    reconciled_at: Option<DateTime<Utc>>,
}

impl TimerEngine {
    /// Create a freshly reset count-up engine
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ever_started(&self) -> bool {
        self.ever_started
    }

    pub fn display(&self) -> DisplayTime {
        self.display
    }

    pub fn actual_start(&self) -> Option<DateTime<Utc>> {
        self.actual_start
    }

    pub fn countdown_total_seconds(&self) -> u64 {
        self.countdown_total_seconds
    }

    /// Reset to the fresh state, optionally switching mode.
    ///
    /// For `CountDown`, `(h, m, s)` seeds the display and the total duration;
    /// they are ignored for `CountUp`.
    pub fn reset(&mut self, mode: Mode, h: u64, m: u32, s: u32) -> Result<(), TimerError> {
        if self.running {
            return Err(TimerError::InvalidOperation);
        }
        let countdown_total_seconds = match mode {
            Mode::CountUp => 0,
            Mode::CountDown => {
                let invalid = TimerError::InvalidDuration { hour: h, min: m, sec: s };
                if m > 59 || s > 59 {
                    return Err(invalid);
                }
                h.checked_mul(3600)
                    .and_then(|total| total.checked_add(u64::from(m) * 60 + u64::from(s)))
                    .filter(|total| *total <= MAX_COUNTDOWN_SECONDS)
                    .ok_or(invalid)?
            }
        };

        *self = Self { mode, countdown_total_seconds, ..Self::default() };
        if mode == Mode::CountDown {
            self.display = DisplayTime::new(h, m as u8, s as u8, 0);
        }

        debug!("Timer reset: mode={:?}, display={}", mode, self.display);
        Ok(())
    }

    /// Start or pause counting
    pub fn toggle(&mut self, now: DateTime<Utc>) -> Result<Transition, TimerError> {
        if self.running {
            self.running = false;
            self.paused_at = Some(now);
            self.reconcile(now);
            debug!("Timer paused at {}", self.display);

            if self.mode == Mode::CountDown && self.display.is_zero() {
                return Ok(Transition::Completed);
            }
            return Ok(Transition::Paused);
        }

        if self.mode == Mode::CountDown && self.display.is_zero() {
            return Err(TimerError::NothingToCount);
        }

        let first_start = if self.ever_started {
            // Push the anchor forward by the paused duration
            if let (Some(adjusted), Some(paused_at)) = (self.adjusted_start, self.paused_at) {
                let shifted = adjusted.checked_add_signed(now - paused_at);
                if shifted.is_none() {
                    warn!("Paused duration out of range, restarting anchor at {}", now);
                }
                self.adjusted_start = Some(shifted.unwrap_or(now));
            }
            None
        } else {
            self.actual_start = Some(now);
            self.adjusted_start = Some(now);
            Some(now)
        };

        self.running = true;
        self.ever_started = true;
        debug!("Timer started from {}", self.display);
        Ok(Transition::Started { first_start })
    }

    /// Advance the display by one tenth in the counting direction
    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }

        match self.mode {
            Mode::CountUp => {
                self.display.increment();
                Tick::Advanced(self.display)
            }
            Mode::CountDown => {
                self.display.decrement();
                if self.display.is_zero() {
                    self.running = false;
                    info!("Countdown reached zero");
                    Tick::Completed(self.display)
                } else {
                    Tick::Advanced(self.display)
                }
            }
        }
    }

    /// Record that the host is about to freeze the process
    pub fn suspend(&mut self, now: DateTime<Utc>) {
        self.suspended_at = Some(now);
    }

    /// Correct the display after a host suspension, at most once per suspension
    pub fn resume_from_suspend(&mut self, now: DateTime<Utc>) -> Reconciliation {
        if !self.running {
            return Reconciliation::Skipped;
        }

        let needs_adjustment = match (self.suspended_at, self.reconciled_at) {
            (Some(suspended), Some(reconciled)) => suspended > reconciled,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !needs_adjustment {
            debug!("Suspension already reconciled, skipping adjustment");
            return Reconciliation::Skipped;
        }

        self.reconcile(now);
        self.reconciled_at = Some(now);
        info!("Timer reconciled after suspension: {}", self.display);

        if self.mode == Mode::CountDown && self.display.is_zero() {
            self.running = false;
            self.paused_at = Some(now);
            return Reconciliation::Completed;
        }
        Reconciliation::Adjusted(self.display)
    }

    /// Capture the full engine state
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            mode: self.mode,
            running: self.running,
            ever_started: self.ever_started,
            hour: self.display.hour,
            min: self.display.min,
            sec: self.display.sec,
            tenth: self.display.tenth,
            countdown_total_seconds: self.countdown_total_seconds,
            actual_start_time: self.actual_start,
            adjusted_start_time: self.adjusted_start,
            paused_at_time: self.paused_at,
            saved_at_time: now,
        }
    }

    /// Rebuild the engine from a snapshot and report whether it is running.
    ///
    /// A running snapshot is reconciled against `now`. A countdown that ran
    /// out in the meantime comes back stopped at zero. An invalid snapshot
    /// leaves the engine freshly reset.
    pub fn restore(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) -> Result<bool, TimerError> {
        if let Err(e) = snapshot.validate() {
            return Err(self.fail_closed(e));
        }

        *self = Self {
            mode: snapshot.mode,
            running: snapshot.running,
            ever_started: snapshot.ever_started,
            display: snapshot.display(),
            countdown_total_seconds: snapshot.countdown_total_seconds,
            actual_start: snapshot.actual_start_time,
            adjusted_start: snapshot.adjusted_start_time,
            paused_at: snapshot.paused_at_time,
            suspended_at: self.suspended_at,
            reconciled_at: Some(now),
        };

        if self.running {
            let gap = now - snapshot.saved_at_time;
            self.reconcile(now);
            info!(
                "Restored running timer after {}ms gap: {}",
                gap.num_milliseconds(),
                self.display
            );
            if self.mode == Mode::CountDown && self.display.is_zero() {
                self.running = false;
                self.paused_at = Some(now);
            }
        } else {
            debug!("Restored stopped timer at {}", self.display);
        }

        Ok(self.running)
    }

    /// Drop all state after an unusable snapshot, handing the error back
    pub fn fail_closed(&mut self, err: TimerError) -> TimerError {
        warn!("Discarding snapshot: {}", err);
        *self = Self::new();
        err
    }

    /// Recompute the display in closed form from the adjusted start anchor
    fn reconcile(&mut self, now: DateTime<Utc>) {
        let Some(adjusted_start) = self.adjusted_start else {
            return;
        };
        let elapsed_ms = (now - adjusted_start).num_milliseconds();
        let total_ms = match self.mode {
            Mode::CountUp => elapsed_ms,
            Mode::CountDown => i64::try_from(self.countdown_total_seconds)
                .ok()
                .and_then(|total| total.checked_mul(1000))
                .unwrap_or(i64::MAX)
                .saturating_sub(elapsed_ms),
        };
        self.display = DisplayTime::from_millis(total_ms);
    }
}
