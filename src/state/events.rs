//! Discrete notifications emitted by the timer session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events the host UI may subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Counting began for the first time since the last reset
    Started { at: DateTime<Utc> },
    /// A countdown reached zero
    Completed,
}
