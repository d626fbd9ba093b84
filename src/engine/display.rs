//! Displayable time value and its carry arithmetic

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hours, minutes, seconds and tenths as broadcast to the display sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTime {
    pub hour: u64,
    pub min: u8,
    pub sec: u8,
    pub tenth: u8,
}

impl DisplayTime {
    pub const ZERO: Self = Self { hour: 0, min: 0, sec: 0, tenth: 0 };

    pub fn new(hour: u64, min: u8, sec: u8, tenth: u8) -> Self {
        Self { hour, min, sec, tenth }
    }

    /// Decompose a millisecond total in closed form; negative totals clamp to zero
    pub fn from_millis(total_ms: i64) -> Self {
        let total_ms = total_ms.max(0) as u64;
        let tenth = ((total_ms % 1000) / 100) as u8;
        let seconds_total = total_ms / 1000;
        let sec = (seconds_total % 60) as u8;
        let minutes_total = seconds_total / 60;
        let min = (minutes_total % 60) as u8;
        let hour = minutes_total / 60;
        Self { hour, min, sec, tenth }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Total milliseconds shown, or `None` if it does not fit in a `u64`
    pub fn total_millis(&self) -> Option<u64> {
        self.hour
            .checked_mul(3_600_000)?
            .checked_add(u64::from(self.min) * 60_000)?
            .checked_add(u64::from(self.sec) * 1000)?
            .checked_add(u64::from(self.tenth) * 100)
    }

    /// Whether every field is inside its range (tenths 0-9, sec/min 0-59)
    pub fn in_range(&self) -> bool {
        self.tenth <= 9 && self.sec <= 59 && self.min <= 59
    }

    /// Advance by one tenth, carrying into seconds, minutes and hours
    pub fn increment(&mut self) {
        self.tenth += 1;
        if self.tenth < 10 {
            return;
        }
        self.tenth = 0;
        self.sec += 1;
        if self.sec < 60 {
            return;
        }
        self.sec = 0;
        self.min += 1;
        if self.min < 60 {
            return;
        }
        self.min = 0;
        self.hour = self.hour.saturating_add(1);
    }

    /// Step back by one tenth, borrowing from larger units.
    /// Returns false (and stays at zero) when already at zero.
    pub fn decrement(&mut self) -> bool {
        if self.is_zero() {
            return false;
        }
        if self.tenth > 0 {
            self.tenth -= 1;
            return true;
        }
        self.tenth = 9;
        if self.sec > 0 {
            self.sec -= 1;
            return true;
        }
        self.sec = 59;
        if self.min > 0 {
            self.min -= 1;
            return true;
        }
        self.min = 59;
        self.hour -= 1;
        true
    }
}

/// Renders as `#h mm:ss:d`
impl fmt::Display for DisplayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {:02}:{:02}:{}", self.hour, self.min, self.sec, self.tenth)
    }
}
