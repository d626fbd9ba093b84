//! Timer engine module
//! 
//! This module contains the timer state machine, its display value, the
//! snapshot record used to survive process suspension, and the time sources.

pub mod clock;
pub mod display;
pub mod error;
pub mod snapshot;
pub mod timer_engine;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use display::DisplayTime;
pub use error::TimerError;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use timer_engine::{Mode, Reconciliation, Tick, TimerEngine, Transition, MAX_COUNTDOWN_SECONDS};
