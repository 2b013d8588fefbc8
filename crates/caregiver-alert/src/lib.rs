//! Caregiver Alerting
//!
//! High-severity hazards are forwarded to a caregiver's chat account.
//! A shared cooldown keeps a burst of detections from turning into a burst
//! of messages, and sends happen on a worker task so the safety loop never
//! waits on the network.

mod cooldown;
mod line;
mod worker;

pub use cooldown::NotificationCooldown;
pub use line::{push_payload, LineNotifier};
pub use worker::{NotificationJob, NotificationQueue, NotificationWorker};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Notification error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Missing channel token or target user id")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Messaging API returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => NotifyError::Status(status.as_u16()),
            None => NotifyError::Http(e.to_string()),
        }
    }
}

/// Outbound caregiver message collaborator
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a text message; false when it was not delivered
    async fn send(&self, message: &str) -> bool;
}

/// LINE Messaging API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Channel access token (bearer)
    pub channel_access_token: Option<String>,
    /// Caregiver's user id
    pub target_user_id: Option<String>,
    /// Push endpoint
    pub api_url: String,
    /// Request timeout (seconds)
    pub timeout_secs: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            target_user_id: None,
            api_url: "https://api.line.me/v2/bot/message/push".to_string(),
            timeout_secs: 3.0,
        }
    }
}

impl LineConfig {
    /// Request timeout, at least 100 ms
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.1)).unwrap_or(Duration::from_secs(3))
    }
}

/// Caregiver alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaregiverConfig {
    pub line: LineConfig,
    /// Minimum spacing between hazard notifications (seconds)
    pub cooldown_secs: f64,
    /// Pending notifications before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for CaregiverConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            cooldown_secs: 3.0,
            queue_capacity: 16,
        }
    }
}

impl CaregiverConfig {
    /// Notification spacing; unrepresentable values fall back to 3 s
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs.max(0.0)).unwrap_or(Duration::from_secs(3))
    }
}
