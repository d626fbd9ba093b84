//! Lapwatch - a stopwatch and countdown timer that survives process suspension
//!
//! This is the main entry point for the lapwatchd daemon.

use std::{path::Path, sync::Arc};
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use lapwatch::{
    api::create_router,
    config::Config,
    engine::SystemClock,
    state::Session,
    tasks::{event_log_task, wake_up_recovery_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("lapwatch={},lapwatchd={},tower_http=info", config.log_level(), config.log_level()))
        .init();

    info!("Starting lapwatchd v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, state_file={:?}",
          config.host, config.port, config.state_file);

    let session = Arc::new(Session::new(Arc::new(SystemClock)));

    if let Some(path) = &config.state_file {
        restore_from_file(&session, path).await;
    }

    // Start background tasks
    let log_session = Arc::clone(&session);
    tokio::spawn(async move {
        event_log_task(log_session).await;
    });

    if !config.no_wake_recovery {
        let wake_session = Arc::clone(&session);
        tokio::spawn(async move {
            wake_up_recovery_task(wake_session).await;
        });
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&session));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /toggle   - Start or pause the timer");
    info!("  POST /reset    - Reset the timer ({{mode, hour, minute, second}})");
    info!("  POST /lap      - Record a lap");
    info!("  POST /suspend  - Host is about to freeze the process");
    info!("  POST /resume   - Host became active again");
    info!("  GET  /snapshot - Current timer snapshot");
    info!("  POST /restore  - Restore a timer snapshot");
    info!("  GET  /status   - Current timer status and laps");
    info!("  GET  /health   - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    session.suspend().await?;
    if let Some(path) = &config.state_file {
        save_to_file(&session, path).await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Restore the session from a saved snapshot, starting fresh if it is unusable
async fn restore_from_file(session: &Session, path: &Path) {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No saved timer state at {}, starting fresh", path.display());
            return;
        }
        Err(e) => {
            warn!("Failed to read {}: {}, starting fresh", path.display(), e);
            return;
        }
    };

    match session.restore_json(&raw).await {
        Ok(running) => info!("Restored timer state from {} (running={})", path.display(), running),
        Err(e) => warn!("Ignoring saved timer state in {}: {}", path.display(), e),
    }
}

/// Write the current snapshot so the next start can pick up where this one left off
async fn save_to_file(session: &Session, path: &Path) -> anyhow::Result<()> {
    let json = session.snapshot()?.to_json()?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write timer state to {}", path.display()))?;
    info!("Saved timer state to {}", path.display());
    Ok(())
}
