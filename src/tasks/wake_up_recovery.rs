//! Wake-up recovery background task

use std::{sync::Arc, time::Duration};
use chrono::Utc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::state::Session;

/// How often the clocks are compared
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock lead over the monotonic clock that counts as a host sleep
const SLEEP_THRESHOLD: Duration = Duration::from_secs(2);

/// Background task that detects host sleep and reconciles the timer.
///
/// The monotonic clock stops while the machine sleeps but the wall clock
/// keeps going, so a wall-clock lead means ticks were missed. The session is
/// then put through a suspend/resume cycle to recompute its display.
pub async fn wake_up_recovery_task(session: Arc<Session>) {
    info!("Starting wake-up recovery task");

    let mut interval = interval(CHECK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_mono = Instant::now();
    let mut last_wall = Utc::now();

    loop {
        interval.tick().await;

        let now_mono = Instant::now();
        let now_wall = Utc::now();
        let mono_elapsed = now_mono.duration_since(last_mono);
        let wall_elapsed = (now_wall - last_wall).to_std().unwrap_or_default();
        last_mono = now_mono;
        last_wall = now_wall;

        let Some(unaccounted) = slept_for(mono_elapsed, wall_elapsed) else {
            continue;
        };

        info!(
            "Host wake-up detected ({}s unaccounted), reconciling timer",
            unaccounted.as_secs()
        );

        if let Err(e) = session.suspend().await {
            warn!("Failed to suspend session after wake-up: {}", e);
            continue;
        }
        if let Err(e) = session.resume().await {
            warn!("Failed to resume session after wake-up: {}", e);
        }
    }
}

/// Wall-clock time the monotonic clock missed, if enough to count as a sleep
fn slept_for(mono_elapsed: Duration, wall_elapsed: Duration) -> Option<Duration> {
    wall_elapsed
        .checked_sub(mono_elapsed)
        .filter(|gap| *gap > SLEEP_THRESHOLD)
}
