//! Timer event logging background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::{Session, TimerEvent};

/// Background task that logs start and completion events from the session
pub async fn event_log_task(session: Arc<Session>) {
    info!("Starting event log task");

    let mut events = session.subscribe_events();

    loop {
        match events.recv().await {
            Ok(TimerEvent::Started { at }) => {
                info!("Counting started at {}", at.format("%Y-%m-%d %H:%M:%S%.3f UTC"));
            }
            Ok(TimerEvent::Completed) => {
                info!("Countdown completed");
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Event log lagged behind, {} events dropped", missed);
            }
            Err(RecvError::Closed) => {
                info!("Event channel closed, stopping event log task");
                break;
            }
        }
    }
}
