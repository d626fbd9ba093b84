//! Session status and lap records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{DisplayTime, Mode, Snapshot, TimerError};

/// A lap captured from the current display value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// 1-based, restarts after every reset
    pub number: u32,
    pub value: DisplayTime,
    pub recorded_at: DateTime<Utc>,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub mode: Mode,
    pub running: bool,
    pub ever_started: bool,
    pub display: DisplayTime,
    /// `display` rendered as `#h mm:ss:d`
    pub current_value: String,
    pub countdown_total_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub laps: Vec<Lap>,
    pub uptime: String,
}

/// Engine snapshot plus the laps recorded since the last reset.
///
/// Serializes flat, so a bare engine snapshot parses as one with no laps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub timer: Snapshot,
    #[serde(default)]
    pub laps: Vec<Lap>,
}

impl SessionSnapshot {
    /// Parse a session snapshot, reporting any malformed field as corruption
    pub fn from_json(raw: &str) -> Result<Self, TimerError> {
        let snapshot: SessionSnapshot = serde_json::from_str(raw)
            .map_err(|e| TimerError::CorruptSnapshot(e.to_string()))?;
        snapshot.timer.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, TimerError> {
        serde_json::to_string_pretty(self).map_err(|e| TimerError::CorruptSnapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TimerEngine;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn laps_travel_with_the_timer() {
        let snapshot = SessionSnapshot {
            timer: TimerEngine::new().snapshot(at(1_000)),
            laps: vec![Lap {
                number: 1,
                value: DisplayTime::new(0, 0, 4, 2),
                recorded_at: at(990),
            }],
        };

        let json = snapshot.to_json().unwrap();
        assert_eq!(SessionSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn bare_engine_snapshot_has_no_laps() {
        let json = TimerEngine::new().snapshot(at(1_000)).to_json().unwrap();
        let parsed = SessionSnapshot::from_json(&json).unwrap();
        assert!(parsed.laps.is_empty());
    }
}
