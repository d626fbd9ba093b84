//! Versioned snapshot record exchanged with the hosting session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timer_engine::MAX_COUNTDOWN_SECONDS, DisplayTime, Mode, TimerError};

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Flat, self-sufficient record of engine state.
///
/// `restore` must be handed back exactly what `snapshot` produced; the
/// storage shape (file, database, bundle) is up to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub mode: Mode,
    pub running: bool,
    pub ever_started: bool,
    pub hour: u64,
    pub min: u8,
    pub sec: u8,
    pub tenth: u8,
    pub countdown_total_seconds: u64,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub adjusted_start_time: Option<DateTime<Utc>>,
    pub paused_at_time: Option<DateTime<Utc>>,
    pub saved_at_time: DateTime<Utc>,
}

impl Snapshot {
    /// Parse a snapshot, reporting any malformed or missing field as corruption
    pub fn from_json(raw: &str) -> Result<Self, TimerError> {
        let snapshot: Snapshot = serde_json::from_str(raw)
            .map_err(|e| TimerError::CorruptSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, TimerError> {
        serde_json::to_string_pretty(self).map_err(|e| TimerError::CorruptSnapshot(e.to_string()))
    }

    pub fn display(&self) -> DisplayTime {
        DisplayTime::new(self.hour, self.min, self.sec, self.tenth)
    }

    /// Check the record is internally consistent
    pub fn validate(&self) -> Result<(), TimerError> {
        let corrupt = |reason: &str| -> Result<(), TimerError> {
            Err(TimerError::CorruptSnapshot(reason.to_string()))
        };

        if self.version != SNAPSHOT_VERSION {
            return Err(TimerError::CorruptSnapshot(format!(
                "unsupported version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if !self.display().in_range() {
            return corrupt("display fields out of range");
        }
        if self.running && !self.ever_started {
            return corrupt("running without ever having started");
        }
        if self.ever_started {
            match (self.actual_start_time, self.adjusted_start_time) {
                (Some(actual), Some(adjusted)) if actual > adjusted => {
                    return corrupt("adjusted start precedes actual start");
                }
                (Some(_), Some(_)) => {}
                _ => return corrupt("started without start anchors"),
            }
            // A countdown that ran out on a tick stops without a pause time
            let finished = self.mode == Mode::CountDown && self.display().is_zero();
            if !self.running && self.paused_at_time.is_none() && !finished {
                return corrupt("paused without a pause time");
            }
        }
        if self.mode == Mode::CountDown {
            if self.countdown_total_seconds > MAX_COUNTDOWN_SECONDS {
                return corrupt("countdown total too long");
            }
            match self.display().total_millis() {
                Some(shown) if shown <= self.countdown_total_seconds * 1000 => {}
                Some(_) => return corrupt("countdown display exceeds its total"),
                None => return corrupt("countdown display too long"),
            }
        }
        Ok(())
    }
}
