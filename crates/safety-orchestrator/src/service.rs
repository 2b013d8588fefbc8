//! Voice commands wired to the safety runner

use std::sync::Arc;
use std::time::Duration;

use caregiver_alert::NotificationSink;
use tracing::info;
use voice_command::{CommandConfig, CommandHandler, FeedbackSpeaker, SpeechListener};

use crate::SafetyRunner;

/// Keeps the voice listener and the safety loop in sync
pub struct VoiceControlService {
    runner: Arc<SafetyRunner>,
    handler: Arc<CommandHandler>,
}

impl VoiceControlService {
    pub fn new(
        runner: Arc<SafetyRunner>,
        config: CommandConfig,
        listener: Arc<dyn SpeechListener>,
        notifier: Arc<dyn NotificationSink>,
        feedback: FeedbackSpeaker,
    ) -> Self {
        let handler = Arc::new(CommandHandler::new(
            config,
            listener,
            runner.clone(),
            notifier,
            feedback,
        ));
        Self { runner, handler }
    }

    /// Listener plus safety loop (full active mode)
    pub async fn start(&self) {
        info!("Starting voice control service (active mode)");
        self.handler.start_listening();
        self.runner.start().await;
    }

    /// Listener only; safety starts on the spoken start phrase
    pub fn start_standby(&self) {
        info!("Starting voice control service (standby mode)");
        self.handler.start_listening();
    }

    pub fn say_greeting(&self) {
        self.handler.say_greeting();
    }

    pub async fn stop(&self) {
        info!("Stopping voice control service");
        self.handler.stop().await;
        self.runner.stop().await;
    }

    pub fn is_safety_running(&self) -> bool {
        self.runner.is_running()
    }

    pub fn handler(&self) -> &Arc<CommandHandler> {
        &self.handler
    }

    /// Wait for the listener to end on its own (input closed)
    pub async fn join_listener(&self, timeout: Option<Duration>) -> bool {
        self.handler.join(timeout).await
    }
}
