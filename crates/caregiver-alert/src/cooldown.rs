//! Notification throttling

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// Single shared cooldown across all hazard types
#[derive(Debug)]
pub struct NotificationCooldown {
    /// Minimum spacing between sends
    cooldown: Duration,
    /// When the last notification was let through
    last_sent: Option<Instant>,
    /// Notifications let through so far
    sent_count: usize,
}

impl NotificationCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: None,
            sent_count: 0,
        }
    }

    /// Whether a notification may be sent now
    pub fn should_send(&self) -> bool {
        match self.last_sent {
            Some(last) if last.elapsed() < self.cooldown => {
                debug!("Notification suppressed: in cooldown period");
                false
            }
            _ => true,
        }
    }

    /// Record that a notification was let through
    pub fn record_send(&mut self) {
        self.last_sent = Some(Instant::now());
        self.sent_count += 1;
        info!("Caregiver notification recorded (count: {})", self.sent_count);
    }

    /// Check and record in one step
    pub fn try_acquire(&mut self) -> bool {
        if !self.should_send() {
            return false;
        }
        self.record_send();
        true
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }
}

impl Default for NotificationCooldown {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
