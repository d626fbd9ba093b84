//! Session state module
//! 
//! This module contains the hosting session that owns the timer engine and
//! its scheduler, along with the events and status it publishes.

pub mod events;
pub mod session;
pub mod status;

// Re-export main types
pub use events::TimerEvent;
pub use session::{Session, SessionError};
pub use status::{Lap, SessionSnapshot, SessionStatus};
