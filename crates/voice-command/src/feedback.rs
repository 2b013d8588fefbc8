//! Spoken acknowledgements on a dedicated worker

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use voice_output::{Priority, VoiceScheduler};

const FEEDBACK_QUEUE: usize = 32;

/// Fire-and-forget speech for command feedback
///
/// Sentences go through the shared scheduler at mid priority, so safety
/// alerts still pre-empt them.
#[derive(Clone)]
pub struct FeedbackSpeaker {
    tx: mpsc::Sender<String>,
}

impl FeedbackSpeaker {
    /// Start the worker; it exits once every speaker handle is dropped
    pub fn spawn(scheduler: Arc<VoiceScheduler>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(FEEDBACK_QUEUE);
        let worker = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                scheduler.speak(&text, Priority::Mid, None).await;
            }
            debug!("Feedback speaker stopped");
        });
        (Self { tx }, worker)
    }

    pub fn say(&self, text: &str) {
        if let Err(e) = self.tx.try_send(text.to_string()) {
            warn!("Feedback dropped ({}): {}", e, text);
        }
    }
}
