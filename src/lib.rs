//! Lapwatch - a stopwatch and countdown timer that survives process suspension
//! 
//! The timer engine derives elapsed and remaining time from wall-clock anchors,
//! so pauses, host sleep and process restarts are reconciled in closed form
//! instead of by replaying missed ticks.

pub mod config;
pub mod engine;
pub mod state;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use engine::{DisplayTime, Mode, Snapshot, TimerEngine, TimerError};
pub use state::{Session, SessionError, SessionSnapshot, TimerEvent};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
