//! Timer engine error taxonomy

use thiserror::Error;

/// Non-fatal conditions reported by the timer engine.
///
/// Every variant describes a rejected state transition; the engine is left
/// either untouched or, for [`TimerError::CorruptSnapshot`], freshly reset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A reset or mode change was requested while the timer is running.
    #[error("operation not allowed while the timer is running")]
    InvalidOperation,

    /// A countdown was started with nothing left on the clock.
    #[error("countdown is already at zero, nothing to count")]
    NothingToCount,

    /// A restore was given a malformed or inconsistent snapshot.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Countdown minutes or seconds out of the 0-59 range, or a total too
    /// long to count in milliseconds.
    #[error("invalid countdown duration: hours={hour}, minutes={min}, seconds={sec}")]
    InvalidDuration { hour: u64, min: u32, sec: u32 },
}
