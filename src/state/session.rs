//! Hosting session that owns one timer engine and its scheduler

use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use crate::{
    engine::{
        Clock, DisplayTime, Mode, Reconciliation, Tick, TimerEngine, TimerError, Transition,
    },
    tasks::Scheduler,
};
use super::{Lap, SessionSnapshot, SessionStatus, TimerEvent};

/// Errors surfaced by session commands
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("failed to lock {0}")]
    LockPoisoned(&'static str),

    /// A lap was requested before the timer ever started
    #[error("timer has not been started since the last reset")]
    NotStarted,
}

/// Owns the engine, drives it with the scheduler, and publishes display
/// values and events to subscribers.
///
/// Commands are serialized by the scheduler lock; the tick loop only ever
/// takes the engine lock, and publishes while holding it so a stale tick can
/// never overwrite a value published by a command.
pub struct Session {
    engine: Arc<Mutex<TimerEngine>>,
    scheduler: AsyncMutex<Scheduler>,
    clock: Arc<dyn Clock>,
    display_tx: Arc<watch::Sender<DisplayTime>>,
    event_tx: broadcast::Sender<TimerEvent>,
    laps: Mutex<Vec<Lap>>,
    created_at: Instant,
}

impl Session {
    /// Create a session with a freshly reset count-up timer
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (display_tx, _) = watch::channel(DisplayTime::ZERO);
        let (event_tx, _) = broadcast::channel(16);

        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new())),
            scheduler: AsyncMutex::new(Scheduler::new()),
            clock,
            display_tx: Arc::new(display_tx),
            event_tx,
            laps: Mutex::new(Vec::new()),
            created_at: Instant::now(),
        }
    }

    /// Receive every display value the session publishes
    pub fn subscribe_display(&self) -> watch::Receiver<DisplayTime> {
        self.display_tx.subscribe()
    }

    /// Receive start and completion events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    /// Last published display value
    pub fn display(&self) -> DisplayTime {
        *self.display_tx.borrow()
    }

    /// Reset the timer, optionally switching mode; rejected while running
    pub async fn reset(&self, mode: Mode, h: u64, m: u32, s: u32) -> Result<DisplayTime, SessionError> {
        let _scheduler = self.scheduler.lock().await;

        let value = {
            let mut engine = self.engine()?;
            engine.reset(mode, h, m, s)?;
            self.display_tx.send_replace(engine.display());
            engine.display()
        };

        self.laps()?.clear();
        info!("Timer reset to {:?} at {}", mode, value);
        Ok(value)
    }

    /// Start or pause counting
    pub async fn toggle(&self) -> Result<Transition, SessionError> {
        let mut scheduler = self.scheduler.lock().await;
        let now = self.clock.now();

        let transition = {
            let mut engine = self.engine()?;
            let transition = engine.toggle(now)?;
            self.display_tx.send_replace(engine.display());
            transition
        };

        match transition {
            Transition::Started { first_start } => {
                if let Some(at) = first_start {
                    info!("Timer started at {}", at);
                    self.notify(TimerEvent::Started { at });
                } else {
                    info!("Timer resumed");
                }
                scheduler.restart(self.tick_callback()).await;
            }
            Transition::Paused => {
                scheduler.stop().await;
                info!("Timer paused at {}", self.display());
            }
            Transition::Completed => {
                scheduler.stop().await;
                info!("Countdown finished while pausing");
                self.notify(TimerEvent::Completed);
            }
        }

        Ok(transition)
    }

    /// Record the current display value as the next lap
    pub async fn lap(&self) -> Result<Lap, SessionError> {
        let _scheduler = self.scheduler.lock().await;

        let value = {
            let engine = self.engine()?;
            if !engine.ever_started() {
                return Err(SessionError::NotStarted);
            }
            engine.display()
        };

        let mut laps = self.laps()?;
        let lap = Lap {
            number: laps.len() as u32 + 1,
            value,
            recorded_at: self.clock.now(),
        };
        laps.push(lap.clone());
        debug!("Lap {} recorded: {}", lap.number, lap.value);
        Ok(lap)
    }

    /// Stop ticking because the host is about to freeze the process.
    ///
    /// Returns only once the tick loop has exited.
    pub async fn suspend(&self) -> Result<(), SessionError> {
        let mut scheduler = self.scheduler.lock().await;
        let now = self.clock.now();

        self.engine()?.suspend(now);
        scheduler.stop().await;
        info!("Session suspended");
        Ok(())
    }

    /// Reconcile after a host suspension and resume ticking if still running
    pub async fn resume(&self) -> Result<Reconciliation, SessionError> {
        let mut scheduler = self.scheduler.lock().await;
        let now = self.clock.now();

        let (reconciliation, running) = {
            let mut engine = self.engine()?;
            let reconciliation = engine.resume_from_suspend(now);
            self.display_tx.send_replace(engine.display());
            (reconciliation, engine.is_running())
        };

        if reconciliation == Reconciliation::Completed {
            info!("Countdown finished while suspended");
            self.notify(TimerEvent::Completed);
        }
        if running {
            scheduler.restart(self.tick_callback()).await;
        }

        info!("Session resumed: {:?}", reconciliation);
        Ok(reconciliation)
    }

    /// Capture the engine state and laps for the host to persist
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let now = self.clock.now();
        let timer = self.engine()?.snapshot(now);
        Ok(SessionSnapshot {
            timer,
            laps: self.laps()?.clone(),
        })
    }

    /// Rebuild the engine and lap list from a snapshot; ticking resumes if it
    /// was running.
    ///
    /// A corrupt snapshot leaves a freshly reset timer with no laps behind and
    /// is reported.
    pub async fn restore(&self, snapshot: &SessionSnapshot) -> Result<bool, SessionError> {
        self.restore_with(snapshot.laps.clone(), |engine, now| {
            engine.restore(&snapshot.timer, now)
        })
        .await
    }

    /// Like [`Session::restore`], for a snapshot still in its JSON form
    pub async fn restore_json(&self, raw: &str) -> Result<bool, SessionError> {
        match SessionSnapshot::from_json(raw) {
            Ok(snapshot) => self.restore(&snapshot).await,
            Err(e) => {
                self.restore_with(Vec::new(), move |engine, _| Err(engine.fail_closed(e)))
                    .await
            }
        }
    }

    async fn restore_with<F>(&self, laps: Vec<Lap>, restore: F) -> Result<bool, SessionError>
    where
        F: FnOnce(&mut TimerEngine, DateTime<Utc>) -> Result<bool, TimerError>,
    {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.stop().await;
        let now = self.clock.now();

        let restored = {
            let mut engine = self.engine()?;
            let restored = restore(&mut *engine, now);
            self.display_tx.send_replace(engine.display());
            restored
        };

        let running = match restored {
            Ok(running) => {
                *self.laps()? = laps;
                running
            }
            Err(e) => {
                self.laps()?.clear();
                return Err(e.into());
            }
        };

        if running {
            scheduler.start(self.tick_callback());
        }
        info!("Session restored (running={})", running);
        Ok(running)
    }

    /// Current session status
    pub fn status(&self) -> Result<SessionStatus, SessionError> {
        let engine = self.engine()?;
        let display = engine.display();

        Ok(SessionStatus {
            mode: engine.mode(),
            running: engine.is_running(),
            ever_started: engine.ever_started(),
            display,
            current_value: display.to_string(),
            countdown_total_seconds: engine.countdown_total_seconds(),
            started_at: engine.actual_start(),
            laps: self.laps()?.clone(),
            uptime: self.get_uptime(),
        })
    }

    /// Calculate session uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.created_at.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Build the per-tick callback handed to the scheduler
    fn tick_callback(&self) -> impl FnMut() -> ControlFlow<()> + Send + 'static {
        let engine = Arc::clone(&self.engine);
        let display_tx = Arc::clone(&self.display_tx);
        let event_tx = self.event_tx.clone();

        move || {
            let mut engine = match engine.lock() {
                Ok(engine) => engine,
                Err(e) => {
                    error!("Failed to lock timer engine: {}", e);
                    return ControlFlow::Break(());
                }
            };

            match engine.tick() {
                Tick::Idle => ControlFlow::Break(()),
                Tick::Advanced(display) => {
                    display_tx.send_replace(display);
                    ControlFlow::Continue(())
                }
                Tick::Completed(display) => {
                    display_tx.send_replace(display);
                    info!("Countdown completed");
                    if event_tx.send(TimerEvent::Completed).is_err() {
                        debug!("No subscribers for completion event");
                    }
                    ControlFlow::Break(())
                }
            }
        }
    }

    fn notify(&self, event: TimerEvent) {
        if let Err(e) = self.event_tx.send(event) {
            debug!("No subscribers for {:?}", e.0);
        }
    }

    fn engine(&self) -> Result<MutexGuard<'_, TimerEngine>, SessionError> {
        self.engine.lock().map_err(|e| {
            warn!("Failed to lock timer engine: {}", e);
            SessionError::LockPoisoned("timer engine")
        })
    }

    fn laps(&self) -> Result<MutexGuard<'_, Vec<Lap>>, SessionError> {
        self.laps.lock().map_err(|e| {
            warn!("Failed to lock lap list: {}", e);
            SessionError::LockPoisoned("lap list")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;
    use crate::engine::ManualClock;
    use crate::tasks::scheduler::TICK_PERIOD;

    fn session() -> (Arc<ManualClock>, Session) {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let session = Session::new(clock.clone());
        (clock, session)
    }

    async fn run_ticks(n: u32) {
        for _ in 0..n {
            tokio::time::advance(TICK_PERIOD).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_start_emits_started_once() {
        let (clock, session) = session();
        let mut events = session.subscribe_events();

        session.toggle().await.unwrap();
        session.toggle().await.unwrap();
        session.toggle().await.unwrap();
        session.toggle().await.unwrap();

        assert_eq!(events.try_recv().unwrap(), TimerEvent::Started { at: clock.now() });
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_reach_the_display_sink() {
        let (_clock, session) = session();
        let display = session.subscribe_display();

        session.toggle().await.unwrap();
        run_ticks(15).await;
        session.suspend().await.unwrap();

        assert_eq!(*display.borrow(), DisplayTime::new(0, 0, 1, 5));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_completion_stops_ticking_and_notifies_once() {
        let (_clock, session) = session();
        let mut events = session.subscribe_events();
        session.reset(Mode::CountDown, 0, 0, 5).await.unwrap();

        session.toggle().await.unwrap();
        run_ticks(51).await;

        assert_eq!(session.display(), DisplayTime::ZERO);
        assert!(!session.status().unwrap().running);
        assert!(matches!(events.try_recv().unwrap(), TimerEvent::Started { .. }));
        assert_eq!(events.try_recv().unwrap(), TimerEvent::Completed);
        assert!(events.try_recv().is_err());

        assert!(matches!(
            session.toggle().await,
            Err(SessionError::Timer(TimerError::NothingToCount))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_stops_ticks_and_resume_reconciles() {
        let (clock, session) = session();
        session.toggle().await.unwrap();
        run_ticks(3).await;

        session.suspend().await.unwrap();
        let frozen = session.display();
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        assert_eq!(session.display(), frozen);

        clock.advance(Duration::seconds(3661));
        let reconciliation = session.resume().await.unwrap();
        assert_eq!(
            reconciliation,
            Reconciliation::Adjusted(DisplayTime::new(1, 1, 1, 0))
        );

        run_ticks(2).await;
        assert_eq!(session.display(), DisplayTime::new(1, 1, 1, 2));
        session.suspend().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_running_leaves_state_unchanged() {
        let (_clock, session) = session();
        session.toggle().await.unwrap();
        run_ticks(4).await;
        session.suspend().await.unwrap();
        let before = session.snapshot().unwrap();

        assert!(matches!(
            session.reset(Mode::CountDown, 0, 1, 0).await,
            Err(SessionError::Timer(TimerError::InvalidOperation))
        ));
        assert_eq!(session.snapshot().unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn laps_number_from_one_and_clear_on_reset() {
        let (_clock, session) = session();
        assert!(matches!(session.lap().await, Err(SessionError::NotStarted)));

        session.toggle().await.unwrap();
        run_ticks(10).await;
        let first = session.lap().await.unwrap();
        run_ticks(5).await;
        let second = session.lap().await.unwrap();
        session.toggle().await.unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(first.value, DisplayTime::new(0, 0, 1, 0));
        assert_eq!(second.number, 2);
        assert_eq!(session.status().unwrap().laps.len(), 2);

        session.reset(Mode::CountUp, 0, 0, 0).await.unwrap();
        assert!(session.status().unwrap().laps.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restore_resumes_ticking_from_reconciled_value() {
        let (clock, session) = session();
        session.toggle().await.unwrap();
        clock.advance(Duration::seconds(2));
        let snapshot = session.snapshot().unwrap();

        session.suspend().await.unwrap();

        let restored = Session::new(clock.clone());
        clock.advance(Duration::seconds(8));
        assert!(restored.restore(&snapshot).await.unwrap());
        assert_eq!(restored.display(), DisplayTime::new(0, 0, 10, 0));

        run_ticks(3).await;
        assert_eq!(restored.display(), DisplayTime::new(0, 0, 10, 3));
        restored.suspend().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restore_never_fires_completion_retroactively() {
        let (clock, session) = session();
        session.reset(Mode::CountDown, 0, 0, 3).await.unwrap();
        session.toggle().await.unwrap();
        session.suspend().await.unwrap();
        let snapshot = session.snapshot().unwrap();

        let restored = Session::new(clock.clone());
        let mut events = restored.subscribe_events();
        clock.advance(Duration::seconds(60));

        assert!(!restored.restore(&snapshot).await.unwrap());
        assert_eq!(restored.display(), DisplayTime::ZERO);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_json_restore_fails_closed() {
        let (_clock, session) = session();
        session.reset(Mode::CountDown, 0, 2, 0).await.unwrap();

        let result = session.restore_json("{\"version\": 1").await;
        assert!(matches!(
            result,
            Err(SessionError::Timer(TimerError::CorruptSnapshot(_)))
        ));

        let status = session.status().unwrap();
        assert_eq!(status.mode, Mode::CountUp);
        assert!(!status.running);
        assert_eq!(status.display, DisplayTime::ZERO);
        assert_eq!(session.display(), DisplayTime::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_replaces_laps_with_the_snapshot_laps() {
        let (clock, session) = session();
        session.toggle().await.unwrap();
        run_ticks(10).await;
        let lap = session.lap().await.unwrap();
        session.toggle().await.unwrap();
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.laps, vec![lap.clone()]);

        let restored = Session::new(clock.clone());
        restored.toggle().await.unwrap();
        run_ticks(3).await;
        restored.lap().await.unwrap();
        restored.lap().await.unwrap();
        restored.toggle().await.unwrap();

        let json = snapshot.to_json().unwrap();
        assert!(!restored.restore_json(&json).await.unwrap());
        assert_eq!(restored.status().unwrap().laps, vec![lap]);

        let next = restored.lap().await.unwrap();
        assert_eq!(next.number, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restore_drops_existing_laps() {
        let (_clock, session) = session();
        session.toggle().await.unwrap();
        run_ticks(2).await;
        session.lap().await.unwrap();
        session.toggle().await.unwrap();

        assert!(session.restore_json("not a snapshot").await.is_err());
        assert!(session.status().unwrap().laps.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_countdown_restores_into_a_new_session() {
        let (clock, session) = session();
        session.reset(Mode::CountDown, 0, 0, 1).await.unwrap();
        session.toggle().await.unwrap();
        run_ticks(11).await;
        assert_eq!(session.display(), DisplayTime::ZERO);
        let snapshot = session.snapshot().unwrap();

        let restored = Session::new(clock.clone());
        assert!(!restored.restore(&snapshot).await.unwrap());
        let status = restored.status().unwrap();
        assert_eq!(status.mode, Mode::CountDown);
        assert_eq!(status.display, DisplayTime::ZERO);
    }
}
