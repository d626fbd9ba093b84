//! Background tasks module
//! 
//! This module contains the tick scheduler and the background tasks that run
//! alongside the HTTP server.

pub mod event_log;
pub mod scheduler;
pub mod wake_up_recovery;

// Re-export main types and functions
pub use event_log::event_log_task;
pub use scheduler::{Scheduler, TICK_PERIOD};
pub use wake_up_recovery::wake_up_recovery_task;
