//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{DisplayTime, Mode};

/// Body of POST /reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub mode: Mode,
    /// Countdown duration; ignored in count-up mode
    #[serde(default)]
    pub hour: u64,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub display: DisplayTime,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, display: DisplayTime) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            display,
        }
    }

    /// Create a running response
    pub fn running(message: String, display: DisplayTime) -> Self {
        Self::new("running".to_string(), message, display)
    }

    /// Create a stopped response
    pub fn stopped(message: String, display: DisplayTime) -> Self {
        Self::new("stopped".to_string(), message, display)
    }

    /// Create an error response
    pub fn error(message: String, display: DisplayTime) -> Self {
        Self::new("error".to_string(), message, display)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
