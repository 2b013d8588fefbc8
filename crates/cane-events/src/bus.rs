//! In-process topic dispatch

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use tracing::{debug, error};

use crate::error::BusError;
use crate::event::Event;

/// Callback invoked with `(topic, payload)` for every publication
pub type Subscriber<P> = Arc<dyn Fn(&str, &P) -> anyhow::Result<()> + Send + Sync>;

/// Topic -> ordered subscriber registry
///
/// Delivery is isolated: a subscriber that errors or panics is logged and
/// skipped, and the remaining subscribers still receive the payload.
pub struct EventBus<P = Event> {
    subscribers: RwLock<HashMap<String, Vec<Subscriber<P>>>>,
}

impl<P> EventBus<P> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a callback for a topic; callbacks run in registration order
    pub fn subscribe<F>(&self, topic: &str, callback: F)
    where
        F: Fn(&str, &P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers
            .entry(topic.to_string())
            .or_default()
            .push(Arc::new(callback));
        debug!("Subscribed to '{}'", topic);
    }

    /// Deliver `payload` to every subscriber of `topic`
    ///
    /// Returns the failed deliveries; an empty vector means every subscriber
    /// (possibly none) accepted the payload.
    pub fn publish(&self, topic: &str, payload: &P) -> Vec<BusError> {
        // Snapshot so callbacks may subscribe without deadlocking.
        let snapshot: Vec<Subscriber<P>> = {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            match subscribers.get(topic) {
                Some(list) => list.clone(),
                None => return Vec::new(),
            }
        };

        let mut failures = Vec::new();
        for (index, callback) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(topic, payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Subscriber #{} on '{}' failed: {:#}", index, topic, e);
                    failures.push(BusError::Subscriber {
                        topic: topic.to_string(),
                        index,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    error!("Subscriber #{} on '{}' panicked", index, topic);
                    failures.push(BusError::Panicked {
                        topic: topic.to_string(),
                        index,
                    });
                }
            }
        }
        failures
    }

    /// Number of callbacks registered for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Remove all registrations (test isolation and reset)
    pub fn clear(&self) {
        self.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}
